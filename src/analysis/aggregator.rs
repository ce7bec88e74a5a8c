//! Per-agent aggregation of classified reports.
//!
//! Views are rebuilt from the full report set on every pass; nothing is
//! cached between calls.

use crate::models::{ClassifiedReport, Verdict};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Verdict of one agent for one regulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegulationVerdict {
    pub regulation: String,
    pub verdict: Verdict,
}

/// All reports of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    /// True when any of the agent's reports was produced with a log.
    pub has_log: bool,
    /// Sorted by regulation.
    pub verdicts: Vec<RegulationVerdict>,
    #[serde(skip)]
    pub reports: HashMap<String, ClassifiedReport>,
}

impl AgentView {
    fn new(report: &ClassifiedReport) -> Self {
        Self {
            id: report.report.agent_id.clone(),
            name: report.report.agent_name.clone(),
            has_log: false,
            verdicts: Vec::new(),
            reports: HashMap::new(),
        }
    }

    /// Report for `regulation`, if the agent was analyzed against it.
    pub fn report(&self, regulation: &str) -> Option<&ClassifiedReport> {
        self.reports.get(regulation)
    }

    pub fn verdict_for(&self, regulation: &str) -> Option<Verdict> {
        self.report(regulation).map(|r| r.verdict)
    }

    /// Reports in regulation order.
    pub fn sorted_reports(&self) -> Vec<&ClassifiedReport> {
        self.verdicts
            .iter()
            .filter_map(|v| self.reports.get(&v.regulation))
            .collect()
    }
}

/// Group reports by agent id.
///
/// A repeated (agent, regulation) pair keeps the last report in input order.
/// Views are sorted by display name, case-insensitively, then by id.
pub fn group(reports: &[ClassifiedReport]) -> Vec<AgentView> {
    let mut views: HashMap<String, AgentView> = HashMap::new();

    for report in reports {
        let view = views
            .entry(report.report.agent_id.clone())
            .or_insert_with(|| AgentView::new(report));

        // prefer a real display name over the id fallback
        if view.name == view.id && report.report.agent_name != report.report.agent_id {
            view.name = report.report.agent_name.clone();
        }
        view.reports
            .insert(report.report.regulation.clone(), report.clone());
    }

    let mut views: Vec<AgentView> = views
        .into_values()
        .map(|mut view| {
            let mut verdicts: Vec<RegulationVerdict> = view
                .reports
                .iter()
                .map(|(regulation, report)| RegulationVerdict {
                    regulation: regulation.clone(),
                    verdict: report.verdict,
                })
                .collect();
            verdicts.sort_by(|a, b| a.regulation.cmp(&b.regulation));
            view.verdicts = verdicts;
            view.has_log = view.reports.values().any(|r| r.report.has_log);
            view
        })
        .collect();

    views.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    views
}

/// One cell of the compliance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "verdict", rename_all = "snake_case")]
pub enum MatrixCell {
    Analyzed(Verdict),
    NotAnalyzed,
}

impl MatrixCell {
    pub fn short_code(&self) -> &'static str {
        match self {
            MatrixCell::Analyzed(verdict) => verdict.short_code(),
            MatrixCell::NotAnalyzed => "-",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub agent_id: String,
    pub agent_name: String,
    /// One cell per entry of [`ComplianceMatrix::regulations`].
    pub cells: Vec<MatrixCell>,
}

/// Agents x regulations.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceMatrix {
    pub regulations: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

/// Cross every agent with every regulation seen in any report.
pub fn matrix(views: &[AgentView]) -> ComplianceMatrix {
    let regulations: Vec<String> = views
        .iter()
        .flat_map(|v| v.reports.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = views
        .iter()
        .map(|view| MatrixRow {
            agent_id: view.id.clone(),
            agent_name: view.name.clone(),
            cells: regulations
                .iter()
                .map(|regulation| match view.verdict_for(regulation) {
                    Some(verdict) => MatrixCell::Analyzed(verdict),
                    None => MatrixCell::NotAnalyzed,
                })
                .collect(),
        })
        .collect();

    ComplianceMatrix { regulations, rows }
}

/// Verdict counts over a set of reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub compliant: usize,
    pub partially_compliant: usize,
    pub non_compliant: usize,
    pub unknown: usize,
}

pub fn dashboard_stats<'a>(reports: impl IntoIterator<Item = &'a ClassifiedReport>) -> DashboardStats {
    let mut stats = DashboardStats::default();

    for report in reports {
        stats.total += 1;
        match report.verdict {
            Verdict::Compliant => stats.compliant += 1,
            Verdict::PartiallyCompliant => stats.partially_compliant += 1,
            Verdict::NonCompliant => stats.non_compliant += 1,
            Verdict::Unknown => stats.unknown += 1,
        }
    }

    stats
}

pub fn find_agent<'a>(views: &'a [AgentView], id: &str) -> Option<&'a AgentView> {
    views.iter().find(|v| v.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParsedReport;

    fn report(id: &str, name: &str, regulation: &str, verdict: Verdict, has_log: bool) -> ClassifiedReport {
        ClassifiedReport {
            report: ParsedReport {
                agent_id: id.to_string(),
                agent_name: name.to_string(),
                regulation: regulation.to_string(),
                has_log,
                log_file: None,
                body: String::new(),
            },
            verdict,
            summary: None,
        }
    }

    fn sample() -> Vec<ClassifiedReport> {
        vec![
            report("b", "beta", "HIPAA", Verdict::NonCompliant, false),
            report("a", "Alpha", "GDPR", Verdict::Compliant, false),
            report("a", "Alpha", "HIPAA", Verdict::PartiallyCompliant, true),
            report("c", "Gamma", "CCPA", Verdict::Unknown, false),
        ]
    }

    #[test]
    fn test_group_sorted_by_name() {
        let views = group(&sample());
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_group_has_log_and_verdict_order() {
        let views = group(&sample());
        let alpha = find_agent(&views, "a").unwrap();

        assert!(alpha.has_log);
        let regs: Vec<_> = alpha.verdicts.iter().map(|v| v.regulation.as_str()).collect();
        assert_eq!(regs, vec!["GDPR", "HIPAA"]);
        assert_eq!(alpha.verdict_for("HIPAA"), Some(Verdict::PartiallyCompliant));
        assert_eq!(alpha.sorted_reports().len(), 2);

        assert!(!find_agent(&views, "b").unwrap().has_log);
        assert!(find_agent(&views, "zzz").is_none());
    }

    #[test]
    fn test_duplicate_pair_last_wins() {
        let reports = vec![
            report("a", "Alpha", "GDPR", Verdict::Compliant, false),
            report("a", "Alpha", "GDPR", Verdict::NonCompliant, false),
        ];
        let views = group(&reports);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].verdicts.len(), 1);
        assert_eq!(views[0].verdict_for("GDPR"), Some(Verdict::NonCompliant));
    }

    #[test]
    fn test_replaced_report_does_not_set_has_log() {
        let reports = vec![
            report("a", "Alpha", "GDPR", Verdict::Compliant, true),
            report("a", "Alpha", "GDPR", Verdict::Compliant, false),
        ];
        assert!(!group(&reports)[0].has_log);
    }

    #[test]
    fn test_group_prefers_real_name() {
        let reports = vec![
            report("x1", "x1", "GDPR", Verdict::Compliant, false),
            report("x1", "Expense Bot", "HIPAA", Verdict::Compliant, false),
        ];
        assert_eq!(group(&reports)[0].name, "Expense Bot");
    }

    #[test]
    fn test_matrix_not_analyzed_cells() {
        let views = group(&sample());
        let m = matrix(&views);

        assert_eq!(m.regulations, vec!["CCPA", "GDPR", "HIPAA"]);

        let alpha = m.rows.iter().find(|r| r.agent_id == "a").unwrap();
        assert_eq!(
            alpha.cells,
            vec![
                MatrixCell::NotAnalyzed,
                MatrixCell::Analyzed(Verdict::Compliant),
                MatrixCell::Analyzed(Verdict::PartiallyCompliant),
            ]
        );
        assert_eq!(alpha.cells[0].short_code(), "-");
    }

    #[test]
    fn test_matrix_empty() {
        let m = matrix(&[]);
        assert!(m.regulations.is_empty());
        assert!(m.rows.is_empty());
    }

    #[test]
    fn test_dashboard_stats() {
        let stats = dashboard_stats(&sample());
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                compliant: 1,
                partially_compliant: 1,
                non_compliant: 1,
                unknown: 1,
            }
        );
    }
}
