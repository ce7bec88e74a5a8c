//! Report artifact parsing.
//!
//! Reports are produced by a separate, loosely controlled stage, so parsing
//! never fails. Fields are gathered by an ordered chain of extractors (header
//! block, file name, base-name fallback); later extractors only fill the gaps
//! left by earlier ones.

use crate::matcher::sanitize;
use crate::models::ParsedReport;

/// Minimum run of `=` that terminates the header block.
const SEPARATOR_MIN_LEN: usize = 10;

const AGENT_PREFIX: &str = "Agent: ";
const ID_PREFIX: &str = "ID: ";
const LOG_FILE_PREFIX: &str = "Log file: ";
const REGULATION_PREFIX: &str = "Regulation: ";

/// Suffix of report file stems (`{agent}_{regulation}_analysis`).
const ANALYSIS_SUFFIX: &str = "_analysis";

/// Field values found by one extractor. `None` means "not found here".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFields {
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub regulation: Option<String>,
    pub log_file: Option<String>,
}

impl ReportFields {
    /// Keep every field already set, fill the rest from `fallback`.
    pub fn or(self, fallback: ReportFields) -> ReportFields {
        ReportFields {
            agent_id: self.agent_id.or(fallback.agent_id),
            agent_name: self.agent_name.or(fallback.agent_name),
            regulation: self.regulation.or(fallback.regulation),
            log_file: self.log_file.or(fallback.log_file),
        }
    }

    fn is_complete(&self) -> bool {
        self.agent_id.is_some() && self.regulation.is_some()
    }
}

/// Parses report text into a [`ParsedReport`].
#[derive(Debug, Clone)]
pub struct ReportParser {
    /// Multi-word regulation names recognized in file names, e.g. `EU-AI-Act`.
    regulation_exceptions: Vec<String>,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new(vec!["EU-AI-Act".to_string()])
    }
}

impl ReportParser {
    pub fn new(regulation_exceptions: Vec<String>) -> Self {
        Self {
            regulation_exceptions,
        }
    }

    /// Parse one report. `base_name` is the artifact's file name; a `.txt`
    /// extension is ignored.
    pub fn parse(&self, text: &str, base_name: &str) -> ParsedReport {
        let base = base_name.strip_suffix(".txt").unwrap_or(base_name);
        let (header, body) = split_header(text);

        let mut fields = header_fields(&header);
        if !fields.is_complete() {
            fields = fields.or(self.filename_fields(base));
        }
        let fields = fields.or(ReportFields {
            agent_id: Some(base.to_string()),
            ..ReportFields::default()
        });

        let agent_id = fields.agent_id.unwrap_or_default();
        let agent_name = fields.agent_name.unwrap_or_else(|| agent_id.clone());

        ParsedReport {
            agent_id,
            agent_name,
            regulation: fields.regulation.unwrap_or_default(),
            has_log: fields.log_file.is_some(),
            log_file: fields.log_file,
            body,
        }
    }

    /// Recover agent id and regulation from `{agent}_{regulation}_analysis`.
    pub fn filename_fields(&self, base: &str) -> ReportFields {
        let stem = base.strip_suffix(ANALYSIS_SUFFIX).unwrap_or(base);

        let split = self
            .exception_split(stem)
            .or_else(|| {
                stem.rsplit_once('_')
                    .filter(|(_, regulation)| looks_like_regulation(regulation))
            })
            .filter(|(agent, _)| !agent.is_empty());

        match split {
            Some((agent, regulation)) => ReportFields {
                agent_id: Some(agent.to_string()),
                regulation: Some(regulation.replace('_', "-")),
                ..ReportFields::default()
            },
            None => ReportFields::default(),
        }
    }

    /// Split off an allow-listed multi-word regulation suffix.
    fn exception_split<'a>(&self, stem: &'a str) -> Option<(&'a str, &'a str)> {
        self.regulation_exceptions.iter().find_map(|exception| {
            let token = sanitize(exception);
            if token.is_empty() || stem.len() <= token.len() {
                return None;
            }

            let at = stem.len() - token.len();
            if !stem.is_char_boundary(at) || !stem[at..].eq_ignore_ascii_case(&token) {
                return None;
            }

            stem[..at]
                .strip_suffix('_')
                .map(|agent| (agent, &stem[at..]))
        })
    }
}

/// A regulation token contains a letter and no lower-case letters.
fn looks_like_regulation(segment: &str) -> bool {
    segment.chars().any(char::is_alphabetic) && !segment.chars().any(char::is_lowercase)
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= SEPARATOR_MIN_LEN && line.chars().all(|c| c == '=')
}

/// Split text at the first separator line. Header lines are scanned up to the
/// separator, or through the whole text when there is none; in that case the
/// whole text is also the body.
fn split_header(text: &str) -> (Vec<&str>, String) {
    let lines: Vec<&str> = text.lines().collect();

    match lines.iter().position(|l| is_separator(l)) {
        Some(at) => (lines[..at].to_vec(), trim_blank_lines(&lines[at + 1..])),
        None => (lines.clone(), trim_blank_lines(&lines)),
    }
}

fn trim_blank_lines(lines: &[&str]) -> String {
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(start);

    lines[start..=end].join("\n")
}

fn header_fields(header: &[&str]) -> ReportFields {
    let mut fields = ReportFields::default();

    for line in header {
        let value = |prefix: &str| {
            line.strip_prefix(prefix)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        if let Some(v) = value(AGENT_PREFIX) {
            fields.agent_name = Some(v);
        } else if let Some(v) = value(ID_PREFIX) {
            fields.agent_id = Some(v);
        } else if let Some(v) = value(LOG_FILE_PREFIX) {
            fields.log_file = (v != "None").then_some(v);
        } else if let Some(v) = value(REGULATION_PREFIX) {
            fields.regulation = Some(v);
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = "Agent: Support Bot\n\
ID: agent-42\n\
Log file: Support_Bot.csv\n\
Regulation: GDPR\n\
============================================================\n\
\n\
## Summary\n\
\n\
The agent is **Compliant**.\n\
\n";

    #[test]
    fn test_full_header() {
        let parser = ReportParser::default();
        let report = parser.parse(FULL_REPORT, "whatever_analysis.txt");

        assert_eq!(report.agent_name, "Support Bot");
        assert_eq!(report.agent_id, "agent-42");
        assert_eq!(report.log_file.as_deref(), Some("Support_Bot.csv"));
        assert!(report.has_log);
        assert_eq!(report.regulation, "GDPR");
        assert_eq!(report.body, "## Summary\n\nThe agent is **Compliant**.");
    }

    #[test]
    fn test_log_file_none() {
        let text = "Agent: A\nID: a\nLog file: None\nRegulation: HIPAA\n==========\nbody";
        let report = ReportParser::default().parse(text, "a_HIPAA_analysis");
        assert!(!report.has_log);
        assert!(report.log_file.is_none());
        assert_eq!(report.body, "body");
    }

    #[test]
    fn test_headerless_filename_recovery() {
        let report = ReportParser::default().parse(
            "# Analysis\n\nNo header here.",
            "agent123_GDPR_analysis.txt",
        );
        assert_eq!(report.agent_id, "agent123");
        assert_eq!(report.regulation, "GDPR");
        assert_eq!(report.agent_name, "agent123");
        assert!(!report.has_log);
        assert_eq!(report.body, "# Analysis\n\nNo header here.");
    }

    #[test]
    fn test_recovery_keeps_underscored_agent_id() {
        let report = ReportParser::default().parse("text", "agent_one_HIPAA_analysis");
        assert_eq!(report.agent_id, "agent_one");
        assert_eq!(report.regulation, "HIPAA");
    }

    #[test]
    fn test_recovery_multi_word_exception() {
        let report = ReportParser::default().parse("text", "agent7_EU_AI_Act_analysis.txt");
        assert_eq!(report.agent_id, "agent7");
        assert_eq!(report.regulation, "EU-AI-Act");
    }

    #[test]
    fn test_recovery_only_fills_gaps() {
        let text = "Agent: Named\nRegulation: CCPA\n==========\nbody";
        let report = ReportParser::default().parse(text, "agent9_GDPR_analysis");
        assert_eq!(report.agent_id, "agent9");
        assert_eq!(report.agent_name, "Named");
        assert_eq!(report.regulation, "CCPA");
    }

    #[test]
    fn test_recovery_rejects_lowercase_segment() {
        let report = ReportParser::default().parse("text", "my_agent_analysis");
        assert_eq!(report.agent_id, "my_agent_analysis");
        assert_eq!(report.regulation, "");
    }

    #[test]
    fn test_fallback_to_base_name() {
        let report = ReportParser::default().parse("", "odd-name");
        assert_eq!(report.agent_id, "odd-name");
        assert_eq!(report.agent_name, "odd-name");
        assert_eq!(report.regulation, "");
        assert_eq!(report.body, "");
    }

    #[test]
    fn test_header_without_separator_still_read() {
        let text = "Agent: Support Bot\nID: agent-42\nLog file: Support_Bot.csv\n\
                    Regulation: GDPR\n\n## Findings\n**Compliant**";
        let report = ReportParser::default().parse(text, "report.txt");
        assert_eq!(report.agent_id, "agent-42");
        assert_eq!(report.agent_name, "Support Bot");
        assert_eq!(report.regulation, "GDPR");
        assert!(report.has_log);
        assert!(report.body.starts_with("Agent: Support Bot\n"));
        assert!(report.body.ends_with("## Findings\n**Compliant**"));
    }

    #[test]
    fn test_partial_header_without_separator_falls_back_to_filename() {
        let text = "Agent: Named\nsome body";
        let report = ReportParser::default().parse(text, "agent5_SOX_analysis");
        assert_eq!(report.agent_id, "agent5");
        assert_eq!(report.agent_name, "Named");
        assert_eq!(report.regulation, "SOX");
        assert_eq!(report.body, "Agent: Named\nsome body");
    }

    #[test]
    fn test_short_equals_line_is_not_separator() {
        let text = "Agent: A\n=====\nbody";
        let report = ReportParser::default().parse(text, "x");
        assert_eq!(report.agent_id, "x");
        assert_eq!(report.agent_name, "A");
        assert_eq!(report.body, "Agent: A\n=====\nbody");
    }

    #[test]
    fn test_crlf_input() {
        let text = "Agent: A\r\nID: a\r\nRegulation: GDPR\r\n==========\r\n\r\nbody\r\n";
        let report = ReportParser::default().parse(text, "a");
        assert_eq!(report.agent_id, "a");
        assert_eq!(report.regulation, "GDPR");
        assert_eq!(report.body, "body");
    }

    #[test]
    fn test_fields_or() {
        let first = ReportFields {
            agent_id: Some("a".to_string()),
            ..ReportFields::default()
        };
        let second = ReportFields {
            agent_id: Some("b".to_string()),
            regulation: Some("GDPR".to_string()),
            ..ReportFields::default()
        };
        let merged = first.or(second);
        assert_eq!(merged.agent_id.as_deref(), Some("a"));
        assert_eq!(merged.regulation.as_deref(), Some("GDPR"));
    }
}
