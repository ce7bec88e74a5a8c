//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.policyaudit.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".policyaudit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Analyzer backend settings.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Report parsing settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of concurrent analyses.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Write one report file per agent here instead of printing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            output_dir: None,
            verbose: false,
        }
    }
}

fn default_concurrency() -> usize {
    1
}

/// Discovery and results locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding agent definition JSON files.
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Directory holding execution-log CSV files.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Directory holding persisted analysis reports.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            logs_dir: default_logs_dir(),
            results_dir: default_results_dir(),
        }
    }
}

fn default_agents_dir() -> PathBuf {
    PathBuf::from("agents")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Which analyzer implementation to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Run an external analyzer program per item.
    #[default]
    Command,
    /// Call the Ollama chat API directly.
    Ollama,
}

/// Analyzer backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: Backend,

    /// Analyzer program for the command backend.
    #[serde(default = "default_command")]
    pub command: String,

    /// Extra arguments placed before the per-item arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Model name passed to the analyzer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-item timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Prompt template for the Ollama backend. `$(REGULATION)` is substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,

    /// Accepted regulation names. Empty accepts any.
    #[serde(default)]
    pub regulations: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            command: default_command(),
            args: Vec::new(),
            model: None,
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            prompt_file: None,
            regulations: Vec::new(),
        }
    }
}

fn default_command() -> String {
    "policyanalyzer".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    900
}

/// Report parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Multi-word regulation names recognized in report file names.
    #[serde(default = "default_regulation_exceptions")]
    pub regulation_exceptions: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            regulation_exceptions: default_regulation_exceptions(),
        }
    }
}

fn default_regulation_exceptions() -> Vec<String> {
    vec!["EU-AI-Act".to_string()]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only when
    /// they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        match &args.command {
            crate::cli::Command::Analyze(a) => {
                self.merge_discovery(&a.discovery);
                if let Some(parallel) = a.parallel {
                    self.general.concurrency = parallel;
                }
                if let Some(ref dir) = a.output_dir {
                    self.general.output_dir = Some(dir.clone());
                }
                if let Some(backend) = a.backend {
                    self.analyzer.backend = backend;
                }
                if let Some(ref model) = a.model {
                    self.analyzer.model = Some(model.clone());
                }
                if let Some(ref url) = a.ollama_url {
                    self.analyzer.ollama_url = url.clone();
                }
                if let Some(timeout) = a.timeout {
                    self.analyzer.timeout_seconds = timeout;
                }
            }
            crate::cli::Command::Agents(a) => self.merge_discovery(&a.discovery),
            crate::cli::Command::Dashboard(v) | crate::cli::Command::Matrix(v) => {
                self.merge_results_dir(&v.results_dir)
            }
            crate::cli::Command::Show(s) => self.merge_results_dir(&s.view.results_dir),
            crate::cli::Command::InitConfig => {}
        }
    }

    fn merge_discovery(&mut self, discovery: &crate::cli::DiscoveryArgs) {
        if let Some(ref dir) = discovery.agents_dir {
            self.paths.agents_dir = dir.clone();
        }
        if let Some(ref dir) = discovery.logs_dir {
            self.paths.logs_dir = dir.clone();
        }
    }

    fn merge_results_dir(&mut self, results_dir: &Option<PathBuf>) {
        if let Some(ref dir) = results_dir {
            self.paths.results_dir = dir.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
