//! Report artifacts: writing, parsing, classification and rendering.

pub mod classifier;
pub mod generator;
pub mod parser;
pub mod writer;

pub use classifier::classify_report;
pub use generator::*;
pub use parser::ReportParser;
pub use writer::write_reports;

use crate::discovery::list_files;
use crate::models::ClassifiedReport;
use std::path::Path;
use tracing::{debug, warn};

/// Load and classify every `*.txt` report in `dir`, in file-name order.
///
/// Unreadable files are skipped with a warning; a missing directory yields
/// no reports.
pub fn load_reports(dir: &Path, parser: &ReportParser) -> Vec<ClassifiedReport> {
    let reports: Vec<ClassifiedReport> = list_files(dir, "txt")
        .into_iter()
        .filter_map(|path| {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Could not read report {}: {}", path.display(), e);
                    return None;
                }
            };
            let base_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            Some(classify_report(parser.parse(&text, &base_name)))
        })
        .collect();

    debug!("Loaded {} reports from {}", reports.len(), dir.display());
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;

    #[test]
    fn test_load_reports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_HIPAA_analysis.txt"),
            "Agent: Beta\nID: b\nLog file: None\nRegulation: HIPAA\n==========\n\n**Non-Compliant**\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_GDPR_analysis.txt"),
            "Everything is **compliant**.",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let reports = load_reports(dir.path(), &ReportParser::default());
        assert_eq!(reports.len(), 2);

        assert_eq!(reports[0].report.agent_id, "a");
        assert_eq!(reports[0].report.regulation, "GDPR");
        assert_eq!(reports[0].verdict, Verdict::Compliant);

        assert_eq!(reports[1].report.agent_name, "Beta");
        assert_eq!(reports[1].verdict, Verdict::NonCompliant);
        assert_eq!(reports[1].short_code(), "NC");
    }

    #[test]
    fn test_load_reports_missing_dir() {
        let reports = load_reports(Path::new("/no/such/results"), &ReportParser::default());
        assert!(reports.is_empty());
    }
}
