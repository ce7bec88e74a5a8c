//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::Backend;
use crate::error::AuditError;
use crate::models::PolicySpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PolicyAudit - compliance analysis for automated agents
///
/// Runs a compliance analyzer over every discovered agent definition and
/// reviews the resulting reports as a dashboard or compliance matrix.
///
/// Examples:
///   policyaudit agents
///   policyaudit analyze --regulation GDPR
///   policyaudit analyze --regulation EU-AI-Act -j 4 --output-dir results/
///   policyaudit analyze --custom-policy my_policy.txt --agent support-bot
///   policyaudit matrix --results-dir results/
///   policyaudit init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .policyaudit.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List discovered agents and their matched execution logs
    Agents(AgentsArgs),

    /// Analyze agents against a regulation or custom policy
    Analyze(AnalyzeArgs),

    /// Summarize persisted reports per agent
    Dashboard(ViewArgs),

    /// Show the agent x regulation compliance matrix
    Matrix(ViewArgs),

    /// Show the reports of a single agent
    Show(ShowArgs),

    /// Generate a default .policyaudit.toml configuration file
    InitConfig,
}

/// Where to discover agents and logs.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DiscoveryArgs {
    /// Directory containing agent definition JSON files
    #[arg(long, value_name = "DIR")]
    pub agents_dir: Option<PathBuf>,

    /// Directory containing execution-log CSV files
    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AgentsArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Regulation to check against (e.g., GDPR, EU-AI-Act, HIPAA)
    #[arg(short, long, value_name = "NAME", conflicts_with = "custom_policy")]
    pub regulation: Option<String>,

    /// Path to a custom policy text file
    #[arg(short = 'p', long, value_name = "FILE")]
    pub custom_policy: Option<PathBuf>,

    /// Agent ID or name to analyze (repeatable)
    #[arg(short, long = "agent", value_name = "AGENT")]
    pub agents: Vec<String>,

    /// Number of analyses to run in parallel
    ///
    /// 1 runs agents one after another in discovery order.
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Directory to save one report per agent (default: print to stdout)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Analyzer backend
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<Backend>,

    /// Model passed to the analyzer
    #[arg(short, long, env = "POLICYAUDIT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Per-agent analysis timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

/// Options shared by the report views.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Directory containing persisted analysis reports
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ShowArgs {
    /// Agent ID to show
    pub agent_id: String,

    /// Only show the report for this regulation
    #[arg(short, long, value_name = "NAME")]
    pub regulation: Option<String>,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// Output format for listings and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Analyze(ref analyze) = self.command {
            if analyze.parallel == Some(0) {
                return Err("Parallelism must be at least 1".to_string());
            }

            if analyze.timeout == Some(0) {
                return Err("Timeout must be at least 1 second".to_string());
            }

            if let Some(ref url) = analyze.ollama_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
                }
            }

            if let Some(ref policy) = analyze.custom_policy {
                if !policy.is_file() {
                    return Err(format!(
                        "Custom policy file does not exist: {}",
                        policy.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl AnalyzeArgs {
    /// Resolve the policy selectors into exactly one policy.
    pub fn policy_spec(&self) -> Result<PolicySpec, AuditError> {
        match (&self.regulation, &self.custom_policy) {
            (Some(_), Some(_)) => Err(AuditError::ConflictingPolicy),
            (Some(regulation), None) => Ok(PolicySpec::Regulation(regulation.clone())),
            (None, Some(path)) => Ok(PolicySpec::Custom(path.clone())),
            (None, None) => Err(AuditError::MissingPolicy),
        }
    }
}
