//! Analysis invocation backends.
//!
//! The analyzer itself is a black box: given an agent definition, an optional
//! execution log and a policy it produces report text or fails. This module
//! defines that boundary and the two backends behind it.

pub mod command;
pub mod ollama;

pub use command::CommandInvoker;
pub use ollama::OllamaInvoker;

use crate::config::{AnalyzerConfig, Backend};
use crate::models::WorkItem;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw outcome of one analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationOutput {
    /// A successful invocation with the given report text.
    pub fn success(stdout: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Produces a report for one work item.
///
/// Implementations own their timeouts. An `Err` and a non-zero exit code are
/// both treated as a failed item by the scheduler.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, item: &WorkItem) -> Result<InvocationOutput>;
}

/// Build the invoker selected by the configuration.
pub fn build_invoker(config: &AnalyzerConfig, verbose: bool) -> Result<Arc<dyn Invoker>> {
    Ok(match config.backend {
        Backend::Command => Arc::new(CommandInvoker::from_config(config, verbose)),
        Backend::Ollama => Arc::new(OllamaInvoker::from_config(config)?),
    })
}
