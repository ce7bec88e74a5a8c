//! Report artifact rendering and persistence.

use crate::matcher::sanitize;
use crate::models::{PolicySpec, WorkResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Line separating the header block from the body.
pub const SEPARATOR: &str = "============================================================";

/// File name of the report for one agent and policy.
pub fn report_file_name(agent_id: &str, policy: &PolicySpec) -> String {
    format!("{}_{}_analysis.txt", sanitize(agent_id), policy.file_token())
}

/// Render the persisted form of a successful result.
pub fn render_report(result: &WorkResult, policy: &PolicySpec, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Agent: {}\n", result.agent.name));
    output.push_str(&format!("ID: {}\n", result.agent.id));
    output.push_str(&format!(
        "Log file: {}\n",
        result.log_name.as_deref().unwrap_or("None")
    ));
    output.push_str(&format!("Regulation: {}\n", policy.label()));
    output.push_str(&format!(
        "Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(SEPARATOR);
    output.push_str("\n\n");
    output.push_str(&result.raw_output);

    if !result.raw_output.ends_with('\n') {
        output.push('\n');
    }

    output
}

/// Write one report per successful result into `dir`.
///
/// Failed results are not persisted. Returns the written paths in result order.
pub fn write_reports(dir: &Path, results: &[WorkResult], policy: &PolicySpec) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let generated_at = Utc::now();
    let mut written = Vec::new();
    let mut seen = HashSet::new();

    for result in results {
        if !result.success {
            warn!(
                "Not saving report for {}: analysis failed",
                result.agent.name
            );
            continue;
        }

        let path = dir.join(report_file_name(&result.agent.id, policy));
        if !seen.insert(path.clone()) {
            warn!(
                "Report {} for {} overwrites one written earlier in this run",
                path.display(),
                result.agent.id
            );
        }
        std::fs::write(&path, render_report(result, policy, generated_at))
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        info!("Saved report: {}", path.display());
        written.push(path);
    }

    Ok(written)
}
