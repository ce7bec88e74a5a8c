//! Markdown and JSON rendering of listings, runs and report views.

use crate::analysis::{AgentView, ComplianceMatrix, DashboardStats};
use crate::models::{MatchedAgent, PolicySpec, RunSummary, Verdict, WorkResult};
use anyhow::Result;
use serde::Serialize;

/// Render any view as pretty JSON.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Discovered agents and their matched logs.
pub fn generate_agents_listing(agents: &[MatchedAgent]) -> String {
    let mut output = String::new();

    output.push_str(&format!("Found {} agents:\n\n", agents.len()));
    for entry in agents {
        let log = entry
            .log
            .as_ref()
            .map(|l| l.name.as_str())
            .unwrap_or("no log");
        output.push_str(&format!(
            "  {}: {} ({})\n",
            entry.agent.id, entry.agent.name, log
        ));
    }

    let with_logs = agents.iter().filter(|a| a.log.is_some()).count();
    output.push_str(&format!(
        "\n{} of {} agents have an execution log\n",
        with_logs,
        agents.len()
    ));

    output
}

/// Report text of every result, in order, for printing to stdout.
pub fn generate_analysis_output(results: &[WorkResult], policy: &PolicySpec) -> String {
    let mut output = String::new();

    for result in results {
        let log = result.log_name.as_deref().unwrap_or("None");
        output.push_str(&format!(
            "# {} ({})\n\nRegulation: {} | Log file: {}\n\n",
            result.agent.name,
            result.agent.id,
            policy.label(),
            log
        ));

        if result.success {
            output.push_str(result.raw_output.trim_end());
        } else {
            output.push_str(&format!("Analysis failed: {}", result.raw_output.trim_end()));
        }
        output.push_str("\n\n---\n\n");
    }

    output
}

/// Run totals and per-item timing, slowest first.
pub fn generate_run_summary(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("📊 Analysis Summary:\n");
    section.push_str(&format!("   Total agents: {}\n", summary.total));
    section.push_str(&format!("   Successful: {}\n", summary.succeeded));
    section.push_str(&format!("   Failed: {}\n", summary.failed));
    section.push_str(&format!("   With logs: {}\n", summary.with_logs));
    section.push_str(&format!(
        "   Analysis time: {:.1}s\n",
        summary.analysis_seconds
    ));
    section.push_str(&format!(
        "   Total time: {:.1}s\n",
        summary.total_elapsed_seconds
    ));

    if !summary.timings.is_empty() {
        section.push_str("\n⏱️  Timing:\n");
        for timing in &summary.timings {
            let status = if timing.success { "✅" } else { "❌" };
            section.push_str(&format!(
                "   {} {}: {:.1}s\n",
                status, timing.agent_name, timing.elapsed_seconds
            ));
        }
    }

    section
}

/// Dashboard: verdict counts and one entry per agent.
pub fn generate_dashboard_markdown(views: &[AgentView], stats: &DashboardStats) -> String {
    let mut output = String::new();

    output.push_str("# Compliance Dashboard\n\n");
    output.push_str(&generate_stats_section(views.len(), stats));

    output.push_str("## Agents\n\n");
    if views.is_empty() {
        output.push_str("No analysis reports found.\n\n");
        return output;
    }

    output.push_str("| Agent | ID | Log | Verdicts |\n");
    output.push_str("|:---|:---|:---:|:---|\n");
    for view in views {
        let verdicts = view
            .verdicts
            .iter()
            .map(|v| format!("{} {}", regulation_label(&v.regulation), v.verdict.short_code()))
            .collect::<Vec<_>>()
            .join(", ");
        let log = if view.has_log { "yes" } else { "no" };
        output.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            view.name, view.id, log, verdicts
        ));
    }
    output.push('\n');

    output.push_str(&generate_legend());
    output
}

fn generate_stats_section(agents: usize, stats: &DashboardStats) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "- **Agents:** {}\n- **Reports:** {}\n\n",
        agents, stats.total
    ));
    section.push_str(&format!(
        "| {} Compliant | {} Partially Compliant | {} Non-Compliant | {} Unknown |\n",
        Verdict::Compliant.emoji(),
        Verdict::PartiallyCompliant.emoji(),
        Verdict::NonCompliant.emoji(),
        Verdict::Unknown.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        stats.compliant, stats.partially_compliant, stats.non_compliant, stats.unknown
    ));

    section
}

/// Agent x regulation table with short codes.
pub fn generate_matrix_markdown(matrix: &ComplianceMatrix) -> String {
    let mut output = String::new();

    output.push_str("# Compliance Matrix\n\n");
    if matrix.rows.is_empty() {
        output.push_str("No analysis reports found.\n\n");
        return output;
    }

    output.push_str("| Agent |");
    for regulation in &matrix.regulations {
        output.push_str(&format!(" {} |", regulation_label(regulation)));
    }
    output.push_str("\n|:---|");
    for _ in &matrix.regulations {
        output.push_str(":---:|");
    }
    output.push('\n');

    for row in &matrix.rows {
        output.push_str(&format!("| {} |", row.agent_name));
        for cell in &row.cells {
            output.push_str(&format!(" {} |", cell.short_code()));
        }
        output.push('\n');
    }
    output.push('\n');

    output.push_str(&generate_legend());
    output
}

/// Every report of one agent, optionally limited to one regulation.
pub fn generate_agent_markdown(view: &AgentView, regulation: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", view.name));
    output.push_str(&format!("- **ID:** `{}`\n", view.id));
    output.push_str(&format!(
        "- **Execution log:** {}\n\n",
        if view.has_log { "yes" } else { "no" }
    ));

    let reports: Vec<_> = view
        .sorted_reports()
        .into_iter()
        .filter(|r| regulation.map_or(true, |wanted| r.report.regulation == wanted))
        .collect();

    if reports.is_empty() {
        output.push_str("No matching reports.\n");
        return output;
    }

    for report in reports {
        output.push_str(&format!(
            "## {} {} - {} ({})\n\n",
            report.verdict.emoji(),
            regulation_label(&report.report.regulation),
            report.verdict,
            report.short_code()
        ));
        if let Some(ref log) = report.report.log_file {
            output.push_str(&format!("*Log file: {}*\n\n", log));
        }
        if let Some(ref summary) = report.summary {
            output.push_str(&format!("> {}\n\n", summary.replace('\n', " ")));
        }
        output.push_str(&report.report.body);
        output.push_str("\n\n---\n\n");
    }

    output
}

fn regulation_label(regulation: &str) -> &str {
    if regulation.is_empty() {
        "(unknown)"
    } else {
        regulation
    }
}

fn generate_legend() -> String {
    "*C = Compliant, PC = Partially Compliant, NC = Non-Compliant, ? = Unknown, - = not analyzed*\n"
        .to_string()
}
