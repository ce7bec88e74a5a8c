//! Name canonicalization and agent-to-log pairing.
//!
//! Log artifacts are named by a separate pipeline, so names drift in spacing,
//! casing and punctuation. Both sides are reduced to a filename-safe token
//! before comparison.

use crate::models::LogRef;
use std::path::Path;
use tracing::debug;

/// Reduce a free-text name to a filename-safe token.
///
/// Alphanumerics are kept, space, `-` and `_` become `_`, everything else is
/// dropped. Runs of `_` collapse to one and leading/trailing `_` are trimmed.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        let mapped = if c.is_alphanumeric() {
            c
        } else if matches!(c, ' ' | '-' | '_') {
            '_'
        } else {
            continue;
        };

        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    out.trim_matches('_').to_string()
}

/// Find the log artifact belonging to `agent_name`.
///
/// Candidates are compared case-insensitively by sanitized file stem, first
/// as-is and then with every `_` removed. The first match in slice order wins.
pub fn match_log<'a>(agent_name: &str, candidates: &'a [LogRef]) -> Option<&'a LogRef> {
    let wanted = sanitize(agent_name).to_lowercase();
    let wanted_compact = wanted.replace('_', "");

    if wanted.is_empty() {
        return None;
    }

    let found = candidates.iter().find(|log| {
        let stem = Path::new(&log.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| log.name.clone());
        let token = sanitize(&stem).to_lowercase();

        token == wanted || token.replace('_', "") == wanted_compact
    });

    if let Some(log) = found {
        debug!("Matched agent '{}' to log {}", agent_name, log.name);
    }

    found
}
