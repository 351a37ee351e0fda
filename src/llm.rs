//! Optional LLM narrative for news summaries.
//!
//! When an OpenAI-compatible API key is configured, the summary produced by
//! the analyzer is sent to a chat-completions endpoint and the reply is
//! attached as a short narrative.

use crate::models::NewsSummary;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// System prompt for narrative generation.
const NARRATIVE_SYSTEM_PROMPT: &str = r#"You are a news editor. You receive a JSON summary of recent news coverage: article counts, trending keywords with scores, companies in the news and sudden topic spikes.

Write a briefing of at most three short paragraphs for a content team:
- Lead with the most significant trend or spike.
- Mention companies only when they appear in the data.
- Do not invent facts, numbers or sources that are not in the summary.

Reply with plain text only."#;

/// Settings of the chat-completions backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Writes narratives through a chat-completions API.
pub struct NarrativeWriter {
    config: LlmConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl NarrativeWriter {
    /// Build a writer, or `None` when no API key is configured.
    pub fn from_config(config: LlmConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            debug!("No LLM API key configured, narratives disabled");
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Some(Self {
            config,
            api_key,
            http_client,
        }))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the model for a narrative of `summary`.
    pub async fn write_summary(&self, summary: &NewsSummary) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: NARRATIVE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(summary)?,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut builder = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
            } else if e.is_connect() {
                anyhow::anyhow!("Cannot connect to LLM API at {}", self.config.base_url)
            } else {
                anyhow::anyhow!("Failed to send request: {}", e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("LLM API error {}: {}", status, body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        first_content(completion).ok_or_else(|| anyhow::anyhow!("LLM response has no content"))
    }
}

/// User prompt carrying the summary as JSON.
fn build_prompt(summary: &NewsSummary) -> Result<String> {
    let body = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    Ok(format!(
        "News summary for the last {}:\n\n{}\n\nWrite the briefing.",
        summary.time_period, body
    ))
}

fn first_content(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .find_map(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendBrief;
    use chrono::Utc;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            timeout_seconds: 30,
            api_key: api_key.map(str::to_string),
            organization: None,
        }
    }

    fn summary() -> NewsSummary {
        NewsSummary {
            time_period: "24 hours".to_string(),
            total_articles: 12,
            sources: 3,
            trending_topics: 1,
            news_spikes: 0,
            top_trends: vec![TrendBrief {
                keyword: "robotics".to_string(),
                mentions: 5,
                trend_score: 0.61,
            }],
            top_companies: vec![],
            recent_spikes: vec![],
            analysis_timestamp: Utc::now(),
            narrative: None,
        }
    }

    #[test]
    fn test_no_api_key_disables_writer() {
        assert!(NarrativeWriter::from_config(config(None)).unwrap().is_none());
        assert!(NarrativeWriter::from_config(config(Some("  "))).unwrap().is_none());
    }

    #[test]
    fn test_api_key_enables_writer() {
        let writer = NarrativeWriter::from_config(config(Some("sk-test"))).unwrap();
        assert_eq!(writer.unwrap().model(), "gpt-4o-mini");
    }

    #[test]
    fn test_prompt_carries_summary() {
        let prompt = build_prompt(&summary()).unwrap();
        assert!(prompt.starts_with("News summary for the last 24 hours"));
        assert!(prompt.contains("\"keyword\": \"robotics\""));
        assert!(!prompt.contains("narrative"));
    }

    #[test]
    fn test_first_content() {
        let response: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": null}},
                {"message": {"role": "assistant", "content": "  Robotics leads.  "}}
            ]
        }))
        .unwrap();
        assert_eq!(first_content(response).as_deref(), Some("Robotics leads."));

        let empty: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(first_content(empty).is_none());
    }
}
