//! Verdict classification for free-form report bodies.
//!
//! Rules are tried in order and the first one that produces a verdict wins:
//!
//! 1. an explicit "Compliance Rating" declaration,
//! 2. a line holding nothing but an emphasized verdict,
//! 3. a vote over every emphasized span in the body.

use crate::models::{ClassifiedReport, ParsedReport, Verdict};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Maximum length of the extracted summary excerpt, in characters.
const SUMMARY_MAX_CHARS: usize = 200;

static DECLARED_RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)compliance\s+rating[\s*#_:|>`\-]*(non[-\s]?compliant|partially\s+compliant|compliant)",
    )
    .expect("valid declared rating regex")
});

static STANDALONE_VERDICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t>*#-]*(?:(?:overall[ \t]+)?rating[ \t]*:[ \t]*(?:\*\*|__)?[ \t]*)?(?:\*\*|__)[ \t]*(?:rating[ \t]*:[ \t]*)?(non[-\s]?compliant|partially\s+compliant|compliant)[ \t]*[.!]?[ \t]*(?:\*\*|__)[ \t.]*\r?$",
    )
    .expect("valid standalone verdict regex")
});

static EMPHASIZED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid emphasis regex"));

static NON_COMPLIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"non[-\s]?compliant").expect("valid non-compliant regex"));

static PARTIALLY_COMPLIANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"partially\s+compliant").expect("valid partially compliant regex")
});

static FUNCTION_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)summary.*?function[:*#\s]*\n+(.*?)(?:\n\n|\n###|\n\d\.|\z)")
        .expect("valid summary regex")
});

type Rule = fn(&str) -> Option<Verdict>;

const RULES: &[(&str, Rule)] = &[
    ("declared rating", declared_rating),
    ("standalone verdict", standalone_verdict),
    ("emphasis vote", emphasis_vote),
];

/// Classify a report body. Never fails; [`Verdict::Unknown`] when no rule
/// finds a signal.
pub fn classify(body: &str) -> Verdict {
    for (name, rule) in RULES {
        if let Some(verdict) = rule(body) {
            debug!("Classified as {} by {} rule", verdict, name);
            return verdict;
        }
    }
    Verdict::Unknown
}

/// Attach a verdict and summary excerpt to a parsed report.
pub fn classify_report(report: ParsedReport) -> ClassifiedReport {
    let verdict = classify(&report.body);
    let summary = extract_summary(&report.body);
    ClassifiedReport {
        report,
        verdict,
        summary,
    }
}

fn declared_rating(body: &str) -> Option<Verdict> {
    DECLARED_RATING
        .captures(body)
        .map(|caps| Verdict::from_phrase(&caps[1]))
}

fn standalone_verdict(body: &str) -> Option<Verdict> {
    STANDALONE_VERDICT
        .captures(body)
        .map(|caps| Verdict::from_phrase(&caps[1]))
}

fn emphasis_vote(body: &str) -> Option<Verdict> {
    let tally = VoteTally::count(body);
    match tally.decide() {
        Verdict::Unknown => None,
        verdict => Some(verdict),
    }
}

/// Verdict phrase counts inside emphasized spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub compliant: usize,
    pub partially_compliant: usize,
    pub non_compliant: usize,
}

impl VoteTally {
    pub fn count(body: &str) -> Self {
        let mut tally = Self::default();
        let mut mentions = 0;

        for caps in EMPHASIZED_SPAN.captures_iter(body) {
            let Some(span) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let span = span.as_str().to_lowercase();

            mentions += span.matches("compliant").count();
            tally.non_compliant += NON_COMPLIANT.find_iter(&span).count();
            tally.partially_compliant += PARTIALLY_COMPLIANT.find_iter(&span).count();
        }

        // every "non-compliant" also contains "compliant"
        tally.compliant = mentions.saturating_sub(tally.non_compliant);
        tally
    }

    pub fn decide(&self) -> Verdict {
        if self.partially_compliant > 0 && self.partially_compliant >= self.non_compliant {
            Verdict::PartiallyCompliant
        } else if self.non_compliant > self.compliant {
            Verdict::NonCompliant
        } else if self.compliant > 0 {
            Verdict::Compliant
        } else {
            Verdict::Unknown
        }
    }
}

/// First paragraph under a "Summary of Agent Function" style heading,
/// truncated for display.
pub fn extract_summary(body: &str) -> Option<String> {
    let caps = FUNCTION_SUMMARY.captures(body)?;
    let text = caps.get(1)?.as_str().trim();
    if text.is_empty() {
        return None;
    }

    if text.chars().count() > SUMMARY_MAX_CHARS {
        let truncated: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
        Some(format!("{}...", truncated))
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_rating() {
        assert_eq!(
            classify("## Compliance Rating\n\nNon-Compliant"),
            Verdict::NonCompliant
        );
        assert_eq!(
            classify("Compliance Rating: **Partially Compliant**"),
            Verdict::PartiallyCompliant
        );
        assert_eq!(
            classify("**Compliance Rating:** Compliant"),
            Verdict::Compliant
        );
        assert_eq!(
            classify("compliance rating - noncompliant"),
            Verdict::NonCompliant
        );
    }

    #[test]
    fn test_declared_rating_beats_emphasis() {
        let body = "The logging is **Compliant** and retention is **Compliant**.\n\n\
                    ## Compliance Rating\n\n**Non-Compliant**";
        assert_eq!(classify(body), Verdict::NonCompliant);
    }

    #[test]
    fn test_standalone_verdict_line() {
        let body = "## Result\n\n**Partially Compliant**\n\nSome controls are **Compliant**.";
        assert_eq!(classify(body), Verdict::PartiallyCompliant);

        assert_eq!(classify("- __Non-Compliant__\n"), Verdict::NonCompliant);
        assert_eq!(classify("Rating: **Compliant**"), Verdict::Compliant);
        assert_eq!(classify("**Rating:** **Compliant**"), Verdict::Compliant);
    }

    #[test]
    fn test_first_standalone_line_wins() {
        let body = "**Non-Compliant**\n\n**Partially Compliant**\n";
        assert_eq!(classify(body), Verdict::NonCompliant);

        let body = "**Partially Compliant**\n\n**Non-Compliant**\n";
        assert_eq!(classify(body), Verdict::PartiallyCompliant);
    }

    #[test]
    fn test_inline_emphasis_is_voted() {
        let body = "The agent is **Partially Compliant** overall, though one control is \
                    **Non-Compliant**.";
        assert_eq!(classify(body), Verdict::PartiallyCompliant);
    }

    #[test]
    fn test_vote_non_compliant_majority() {
        let body = "Storage is **non-compliant**, access is **non compliant**, \
                    logging is **compliant**.";
        let tally = VoteTally::count(body);
        assert_eq!(tally.non_compliant, 2);
        assert_eq!(tally.compliant, 1);
        assert_eq!(tally.partially_compliant, 0);
        assert_eq!(classify(body), Verdict::NonCompliant);
    }

    #[test]
    fn test_vote_compliant() {
        assert_eq!(
            classify("Every control reviewed is **compliant** with the rule."),
            Verdict::Compliant
        );
    }

    #[test]
    fn test_vote_tie_is_compliant() {
        let body = "One area is **Compliant**, another is **Non-Compliant** today.";
        assert_eq!(classify(body), Verdict::Compliant);
    }

    #[test]
    fn test_no_signal_is_unknown() {
        assert_eq!(classify(""), Verdict::Unknown);
        assert_eq!(
            classify("The agent appears compliant but nothing is emphasized."),
            Verdict::Unknown
        );
        assert_eq!(classify("**Compliance** was reviewed."), Verdict::Unknown);
    }

    #[test]
    fn test_tally_decide() {
        let tally = VoteTally {
            compliant: 0,
            partially_compliant: 1,
            non_compliant: 2,
        };
        assert_eq!(tally.decide(), Verdict::NonCompliant);
        assert_eq!(VoteTally::default().decide(), Verdict::Unknown);
    }

    #[test]
    fn test_extract_summary() {
        let body = "## Summary of Agent Function\n\nBooks meetings for staff.\nUses calendars.\n\n## Findings";
        assert_eq!(
            extract_summary(body).as_deref(),
            Some("Books meetings for staff.\nUses calendars.")
        );

        let long = format!("## Summary of Agent Function\n\n{}\n\nrest", "x".repeat(250));
        let summary = extract_summary(&long).unwrap();
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));

        assert!(extract_summary("no heading at all").is_none());
    }

    #[test]
    fn test_classify_report() {
        let parsed = ParsedReport {
            agent_id: "a".to_string(),
            agent_name: "A".to_string(),
            regulation: "GDPR".to_string(),
            has_log: false,
            log_file: None,
            body: "## Compliance Rating\n**Compliant**".to_string(),
        };
        let classified = classify_report(parsed);
        assert_eq!(classified.verdict, Verdict::Compliant);
        assert!(classified.summary.is_none());
        assert_eq!(classified.report.agent_id, "a");
    }
}
