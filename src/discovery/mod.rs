//! Discovery of agent definitions and execution logs.
//!
//! Agent definitions are JSON files produced by an upstream import step;
//! execution logs are CSV files produced by a separate pipeline. Both are
//! enumerated in file-name order so every run sees the same sequence.

use crate::models::{AgentRef, LogRef};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Summary file written next to agent definitions by the importer.
const SUMMARY_FILE_NAME: &str = "_summary.json";

/// Fields read from an agent definition. Everything else is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentDefinition {
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    agent_name: Option<String>,
    #[serde(default)]
    config: Option<AgentDefinitionConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentDefinitionConfig {
    #[serde(default)]
    name: Option<String>,
}

/// List files directly inside `dir` with the given extension, sorted by name.
///
/// A missing directory yields an empty list.
pub(crate) fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!("Directory not found: {}", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Load identity and display name from one agent definition file.
pub fn load_agent(path: &Path) -> Result<AgentRef> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read agent definition: {}", path.display()))?;

    let definition: AgentDefinition = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse agent definition: {}", path.display()))?;

    let stem = file_stem(path);
    let id = definition
        .agent_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| stem.clone());
    let name = definition
        .agent_name
        .or_else(|| definition.config.and_then(|c| c.name))
        .filter(|name| !name.is_empty())
        .unwrap_or(stem);

    Ok(AgentRef {
        id,
        name,
        definition_path: path.to_path_buf(),
    })
}

/// Discover all agent definitions in `dir`.
///
/// Files that cannot be read or parsed are skipped with a warning.
pub fn discover_agents(dir: &Path) -> Vec<AgentRef> {
    list_files(dir, "json")
        .into_iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(SUMMARY_FILE_NAME))
        .filter_map(|p| match load_agent(&p) {
            Ok(agent) => Some(agent),
            Err(e) => {
                warn!("Could not load {}: {:#}", p.display(), e);
                None
            }
        })
        .collect()
}

/// Discover all execution logs in `dir`.
pub fn discover_logs(dir: &Path) -> Vec<LogRef> {
    list_files(dir, "csv")
        .into_iter()
        .map(|path| LogRef {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path,
        })
        .collect()
}

/// Keep agents whose id or display name appears in `filters`.
pub fn filter_agents(agents: Vec<AgentRef>, filters: &[String]) -> Vec<AgentRef> {
    if filters.is_empty() {
        return agents;
    }

    agents
        .into_iter()
        .filter(|a| filters.iter().any(|f| f == &a.id || f == &a.name))
        .collect()
}
