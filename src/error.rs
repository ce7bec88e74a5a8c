//! Domain errors that abort a run.
//!
//! Per-item analysis failures never surface here; they are recorded on the
//! individual `WorkResult` and reported in the run summary instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal orchestration errors. Each maps to exit code 1.
#[derive(Debug, Error)]
pub enum AuditError {
    /// No agent definition files were discovered.
    #[error("No agent files found in {}", .0.display())]
    NoAgents(PathBuf),

    /// Neither `--regulation` nor `--custom-policy` was given.
    #[error("One of --regulation or --custom-policy is required")]
    MissingPolicy,

    /// Both policy selectors were given.
    #[error("--regulation and --custom-policy cannot be used together")]
    ConflictingPolicy,

    /// The regulation is not in the configured allow-list.
    #[error("Unknown regulation '{name}'. Allowed: {}", .allowed.join(", "))]
    UnknownRegulation { name: String, allowed: Vec<String> },

    /// The `--agent` filter matched none of the discovered agents.
    #[error("No matching agents found for: {}", .0.join(", "))]
    NoMatchingAgents(Vec<String>),

    /// Concurrency must be at least 1.
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuditError::NoMatchingAgents(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "No matching agents found for: a, b");

        let err = AuditError::UnknownRegulation {
            name: "XYZ".to_string(),
            allowed: vec!["GDPR".to_string(), "HIPAA".to_string()],
        };
        assert!(err.to_string().contains("GDPR, HIPAA"));

        let err = AuditError::NoAgents(PathBuf::from("agents"));
        assert_eq!(err.to_string(), "No agent files found in agents");
    }
}
