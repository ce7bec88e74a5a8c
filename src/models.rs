//! Data models for the compliance auditor.
//!
//! This module contains the core records passed between discovery,
//! scheduling, report parsing and aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::matcher::sanitize;

/// An agent definition discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    /// Stable identifier (`agentId`, or the file stem).
    pub id: String,
    /// Display name, not guaranteed unique.
    pub name: String,
    /// Path to the definition artifact.
    pub definition_path: PathBuf,
}

/// An execution-log artifact that may belong to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRef {
    /// File name of the log, including extension.
    pub name: String,
    /// Path to the log artifact.
    pub path: PathBuf,
}

/// A discovered agent paired with its execution log, if one matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedAgent {
    #[serde(flatten)]
    pub agent: AgentRef,
    pub log: Option<LogRef>,
}

/// The yardstick an agent is analyzed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySpec {
    /// A named regulation such as `GDPR` or `EU-AI-Act`.
    Regulation(String),
    /// A custom policy document.
    Custom(PathBuf),
}

impl PolicySpec {
    /// Label written to the `Regulation:` report header.
    pub fn label(&self) -> String {
        match self {
            PolicySpec::Regulation(name) => name.clone(),
            PolicySpec::Custom(_) => "Custom policy".to_string(),
        }
    }

    /// Token used in report file names (`{agent}_{token}_analysis.txt`).
    pub fn file_token(&self) -> String {
        match self {
            PolicySpec::Regulation(name) => sanitize(name),
            PolicySpec::Custom(_) => "CUSTOM".to_string(),
        }
    }
}

impl fmt::Display for PolicySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicySpec::Regulation(name) => write!(f, "{}", name),
            PolicySpec::Custom(path) => write!(f, "custom policy {}", path.display()),
        }
    }
}

/// One unit of scheduled analysis work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub agent: AgentRef,
    pub policy: PolicySpec,
    pub log: Option<LogRef>,
    /// Submission position, used to restore order after concurrent completion.
    pub sequence_index: usize,
}

/// Outcome of a single work item.
#[derive(Debug, Clone, Serialize)]
pub struct WorkResult {
    pub sequence_index: usize,
    pub agent: AgentRef,
    pub success: bool,
    /// Report text on success, diagnostic text on failure.
    pub raw_output: String,
    pub elapsed: Duration,
    pub had_log: bool,
    /// Name of the log file used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,
}

/// Compliance verdict extracted from a report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Compliant => write!(f, "Compliant"),
            Verdict::PartiallyCompliant => write!(f, "Partially Compliant"),
            Verdict::NonCompliant => write!(f, "Non-Compliant"),
            Verdict::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Verdict {
    /// Short code used in matrix cells.
    pub fn short_code(&self) -> &'static str {
        match self {
            Verdict::Compliant => "C",
            Verdict::PartiallyCompliant => "PC",
            Verdict::NonCompliant => "NC",
            Verdict::Unknown => "?",
        }
    }

    /// Returns an emoji representation of the verdict.
    pub fn emoji(&self) -> &'static str {
        match self {
            Verdict::Compliant => "🟢",
            Verdict::PartiallyCompliant => "🟡",
            Verdict::NonCompliant => "🔴",
            Verdict::Unknown => "⚪",
        }
    }

    /// Map a matched verdict phrase ("non-compliant", "Partially Compliant", ...)
    /// to a verdict.
    pub fn from_phrase(phrase: &str) -> Self {
        let lower = phrase.to_lowercase();
        if lower.starts_with("non") {
            Verdict::NonCompliant
        } else if lower.starts_with("partial") {
            Verdict::PartiallyCompliant
        } else if lower.contains("compliant") {
            Verdict::Compliant
        } else {
            Verdict::Unknown
        }
    }
}

/// Structured fields extracted from a persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedReport {
    pub agent_id: String,
    pub agent_name: String,
    pub regulation: String,
    pub has_log: bool,
    /// Value of the `Log file:` header, when present and not `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    pub body: String,
}

/// A parsed report together with its verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedReport {
    #[serde(flatten)]
    pub report: ParsedReport,
    pub verdict: Verdict,
    /// Short function summary for dashboard cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ClassifiedReport {
    pub fn short_code(&self) -> &'static str {
        self.verdict.short_code()
    }
}

/// Timing line for one item of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ItemTiming {
    pub agent_name: String,
    pub success: bool,
    pub elapsed_seconds: f64,
}

/// Summary of an analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub with_logs: usize,
    /// Sum of per-item durations. Exceeds `total_elapsed_seconds` when items overlap.
    pub analysis_seconds: f64,
    /// Wall-clock duration of the whole run.
    pub total_elapsed_seconds: f64,
    /// Per-item timings, slowest first.
    pub timings: Vec<ItemTiming>,
}

impl RunSummary {
    /// Creates a summary from the results of a run.
    pub fn from_results(results: &[WorkResult], total_elapsed: Duration) -> Self {
        let mut timings: Vec<ItemTiming> = results
            .iter()
            .map(|r| ItemTiming {
                agent_name: r.agent.name.clone(),
                success: r.success,
                elapsed_seconds: r.elapsed.as_secs_f64(),
            })
            .collect();
        timings.sort_by(|a, b| {
            b.elapsed_seconds
                .partial_cmp(&a.elapsed_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let succeeded = results.iter().filter(|r| r.success).count();

        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            with_logs: results.iter().filter(|r| r.had_log).count(),
            analysis_seconds: results.iter().map(|r| r.elapsed.as_secs_f64()).sum(),
            total_elapsed_seconds: total_elapsed.as_secs_f64(),
            timings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, name: &str, success: bool, secs: u64, had_log: bool) -> WorkResult {
        WorkResult {
            sequence_index: index,
            agent: AgentRef {
                id: name.to_lowercase(),
                name: name.to_string(),
                definition_path: PathBuf::from(format!("{}.json", name)),
            },
            success,
            raw_output: String::new(),
            elapsed: Duration::from_secs(secs),
            had_log,
            log_name: None,
        }
    }

    #[test]
    fn test_verdict_short_codes() {
        assert_eq!(Verdict::Compliant.short_code(), "C");
        assert_eq!(Verdict::PartiallyCompliant.short_code(), "PC");
        assert_eq!(Verdict::NonCompliant.short_code(), "NC");
        assert_eq!(Verdict::Unknown.short_code(), "?");
    }

    #[test]
    fn test_verdict_from_phrase() {
        assert_eq!(Verdict::from_phrase("Non-Compliant"), Verdict::NonCompliant);
        assert_eq!(Verdict::from_phrase("non compliant"), Verdict::NonCompliant);
        assert_eq!(
            Verdict::from_phrase("PARTIALLY COMPLIANT"),
            Verdict::PartiallyCompliant
        );
        assert_eq!(Verdict::from_phrase("compliant"), Verdict::Compliant);
        assert_eq!(Verdict::from_phrase("pending"), Verdict::Unknown);
    }

    #[test]
    fn test_policy_labels_and_tokens() {
        let reg = PolicySpec::Regulation("EU-AI-Act".to_string());
        assert_eq!(reg.label(), "EU-AI-Act");
        assert_eq!(reg.file_token(), "EU_AI_Act");

        let custom = PolicySpec::Custom(PathBuf::from("policies/internal.txt"));
        assert_eq!(custom.label(), "Custom policy");
        assert_eq!(custom.file_token(), "CUSTOM");
    }

    #[test]
    fn test_run_summary() {
        let results = vec![
            result(0, "Alpha", true, 3, true),
            result(1, "Beta", false, 7, false),
            result(2, "Gamma", true, 5, true),
        ];

        let summary = RunSummary::from_results(&results, Duration::from_secs(8));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.with_logs, 2);
        assert_eq!(summary.analysis_seconds, 15.0);
        assert_eq!(summary.total_elapsed_seconds, 8.0);
        assert_eq!(summary.timings[0].agent_name, "Beta");
        assert_eq!(summary.timings[2].agent_name, "Alpha");
    }
}
