//! External analyzer program backend.

use super::{InvocationOutput, Invoker};
use crate::config::AnalyzerConfig;
use crate::models::{PolicySpec, WorkItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs an analyzer program once per work item and captures its output.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    base_args: Vec<String>,
    model: Option<String>,
    verbose: bool,
    timeout: Duration,
}

impl CommandInvoker {
    pub fn new(program: impl Into<String>, base_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args,
            model: None,
            verbose: false,
            timeout,
        }
    }

    pub fn from_config(config: &AnalyzerConfig, verbose: bool) -> Self {
        Self {
            model: config.model.clone(),
            verbose,
            ..Self::new(
                config.command.clone(),
                config.args.clone(),
                Duration::from_secs(config.timeout_seconds),
            )
        }
    }

    /// Arguments for one item, after the configured base arguments.
    pub fn item_args(&self, item: &WorkItem) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();

        args.push("--agent-definition".into());
        args.push(item.agent.definition_path.clone().into_os_string());

        match &item.policy {
            PolicySpec::Regulation(name) => {
                args.push("--regulation".into());
                args.push(name.into());
            }
            PolicySpec::Custom(path) => {
                args.push("--custom-policy".into());
                args.push(path.clone().into_os_string());
            }
        }

        if let Some(ref log) = item.log {
            args.push("--sample-log".into());
            args.push(log.path.clone().into_os_string());
        }

        if let Some(ref model) = self.model {
            args.push("--model".into());
            args.push(model.into());
        }

        if self.verbose {
            args.push("--verbose".into());
        }

        args
    }
}

#[async_trait]
impl Invoker for CommandInvoker {
    async fn invoke(&self, item: &WorkItem) -> Result<InvocationOutput> {
        let args = self.item_args(item);
        debug!("Running {} {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start analyzer '{}'", self.program))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Analysis of {} timed out after {}s",
                    item.agent.name,
                    self.timeout.as_secs()
                )
            })?
            .context("Failed to wait for analyzer")?;

        Ok(InvocationOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
