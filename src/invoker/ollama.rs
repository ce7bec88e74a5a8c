//! Ollama chat API backend.
//!
//! Builds one prompt per work item from a template plus labelled sections
//! for the agent definition, the sample log and the custom policy, and sends
//! it in a single non-streaming chat request.

use super::{InvocationOutput, Invoker};
use crate::config::AnalyzerConfig;
use crate::models::{PolicySpec, WorkItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Placeholder replaced by the regulation name in the prompt template.
const REGULATION_PLACEHOLDER: &str = "$(REGULATION)";

/// Model used when none is configured.
const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Sends each work item to an Ollama model as a single chat request.
pub struct OllamaInvoker {
    http_client: reqwest::Client,
    ollama_url: String,
    model_name: String,
    temperature: f32,
    timeout_seconds: u64,
    prompt_template: String,
}

impl OllamaInvoker {
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        let prompt_template = match config.prompt_file {
            Some(ref path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?,
            None => DEFAULT_PROMPT_TEMPLATE.to_string(),
        };

        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        info!(
            "Initializing Ollama analyzer with model {} at {}",
            model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            ollama_url: config.ollama_url.clone(),
            model_name,
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            prompt_template,
        })
    }

    /// Assemble the prompt for one work item.
    pub async fn build_prompt(&self, item: &WorkItem) -> Result<String> {
        let regulation = match &item.policy {
            PolicySpec::Regulation(name) => name.as_str(),
            PolicySpec::Custom(_) => "",
        };

        let agent_definition = tokio::fs::read_to_string(&item.agent.definition_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read agent definition: {}",
                    item.agent.definition_path.display()
                )
            })?;

        let mut prompt = self
            .prompt_template
            .replace(REGULATION_PLACEHOLDER, regulation);
        prompt.push_str(&format!("\n\n[AGENT_DEFINITION]\n{}", agent_definition));

        if let Some(ref log) = item.log {
            let sample_log = tokio::fs::read_to_string(&log.path)
                .await
                .with_context(|| format!("Failed to read sample log: {}", log.path.display()))?;
            prompt.push_str(&format!("\n\n[SAMPLE_LOG]\n{}", sample_log));
        }

        if let PolicySpec::Custom(ref path) = item.policy {
            let custom_policy = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read custom policy: {}", path.display()))?;
            prompt.push_str(&format!("\n\n[CUSTOM_POLICY]\n{}", custom_policy));
        }

        debug!(
            "Prompt for {} is {} characters",
            item.agent.name,
            prompt.len()
        );

        Ok(prompt)
    }

    async fn send_prompt(&self, prompt: String) -> Result<String> {
        let url = format!("{}/api/chat", self.ollama_url);

        let request = OllamaChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to Ollama at {}", self.ollama_url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl Invoker for OllamaInvoker {
    async fn invoke(&self, item: &WorkItem) -> Result<InvocationOutput> {
        let prompt = self.build_prompt(item).await?;
        let report = self.send_prompt(prompt).await?;
        Ok(InvocationOutput::success(report))
    }
}

/// Default analysis prompt.
const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are a compliance auditor reviewing an automated agent.

Evaluate the agent described in [AGENT_DEFINITION] against $(REGULATION). When a
[CUSTOM_POLICY] section is present, evaluate against that policy instead. When a
[SAMPLE_LOG] section is present, use it as evidence of the agent's real behaviour.

Structure the report in Markdown:

## Summary of Agent Function
One paragraph describing what the agent does.

## Findings
Each relevant requirement, the evidence, and whether the agent meets it.

## Compliance Rating
Exactly one of **Compliant**, **Partially Compliant** or **Non-Compliant**.

## Recommendations
Concrete remediation steps."#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentRef, LogRef};

    #[tokio::test]
    async fn test_build_prompt_sections() {
        let dir = tempfile::tempdir().unwrap();
        let agent_path = dir.path().join("agent.json");
        let log_path = dir.path().join("Agent.csv");
        let policy_path = dir.path().join("policy.txt");
        std::fs::write(&agent_path, r#"{"agentId": "a"}"#).unwrap();
        std::fs::write(&log_path, "ts,event\n1,hello\n").unwrap();
        std::fs::write(&policy_path, "No personal data.").unwrap();

        let config = AnalyzerConfig::default();
        let invoker = OllamaInvoker::from_config(&config).unwrap();

        let mut item = WorkItem {
            agent: AgentRef {
                id: "a".to_string(),
                name: "Agent".to_string(),
                definition_path: agent_path,
            },
            policy: PolicySpec::Regulation("GDPR".to_string()),
            log: Some(LogRef {
                name: "Agent.csv".to_string(),
                path: log_path,
            }),
            sequence_index: 0,
        };

        let prompt = invoker.build_prompt(&item).await.unwrap();
        assert!(prompt.contains("against GDPR"));
        assert!(!prompt.contains(REGULATION_PLACEHOLDER));
        assert!(prompt.contains("[AGENT_DEFINITION]\n{\"agentId\": \"a\"}"));
        assert!(prompt.contains("[SAMPLE_LOG]\nts,event"));
        assert!(!prompt.contains("[CUSTOM_POLICY]\n"));

        item.policy = PolicySpec::Custom(policy_path);
        item.log = None;
        let prompt = invoker.build_prompt(&item).await.unwrap();
        assert!(prompt.contains("[CUSTOM_POLICY]\nNo personal data."));
        assert!(!prompt.contains("[SAMPLE_LOG]\n"));
    }

    #[tokio::test]
    async fn test_build_prompt_missing_definition() {
        let invoker = OllamaInvoker::from_config(&AnalyzerConfig::default()).unwrap();
        let item = WorkItem {
            agent: AgentRef {
                id: "a".to_string(),
                name: "Agent".to_string(),
                definition_path: "/no/such/agent.json".into(),
            },
            policy: PolicySpec::Regulation("GDPR".to_string()),
            log: None,
            sequence_index: 0,
        };
        assert!(invoker.build_prompt(&item).await.is_err());
    }

    #[test]
    fn test_custom_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Check $(REGULATION).").unwrap();

        let config = AnalyzerConfig {
            prompt_file: Some(path),
            ..AnalyzerConfig::default()
        };
        let invoker = OllamaInvoker::from_config(&config).unwrap();
        assert_eq!(invoker.prompt_template, "Check $(REGULATION).");
        assert_eq!(invoker.model_name, DEFAULT_MODEL);
    }
}
