//! Chat backend abstraction and implementations.
//!
//! Defines the [`ChatBackend`] trait and concrete implementations:
//! - **[`DisabledBackend`]**: returns errors; used when chat is not configured.
//! - **[`AnthropicBackend`]**: calls the Anthropic Messages API with retry and backoff.
//!
//! # Backend Selection
//!
//! Use [`create_backend`] to instantiate the backend named by `[chat].provider`:
//!
//! ```rust,no_run
//! # use research_exchange::config::ChatConfig;
//! # use research_exchange::chat::create_backend;
//! let config = ChatConfig::default(); // provider = "disabled"
//! let backend = create_backend(&config).unwrap();
//! assert!(!backend.is_enabled());
//! ```
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use research_exchange_core::prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChatConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// A completed assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub usage: Option<Usage>,
    pub model_used: String,
}

/// A language-model backend that answers a conversation under a system prompt.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier reported in replies.
    fn model_name(&self) -> &str;

    /// `false` only for the disabled placeholder.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<ChatReply>;
}

/// Placeholder backend used when `[chat].provider = "disabled"`.
pub struct DisabledBackend;

#[async_trait]
impl ChatBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn complete(&self, _system: &str, _messages: &[ChatMessage]) -> Result<ChatReply> {
        bail!("chat is disabled; set [chat].provider in config")
    }
}

// ============ Anthropic Backend ============

/// Backend calling `POST {url}/v1/messages`.
///
/// The API key is read from the environment variable named by
/// `[chat].api_key_env` when the backend is created.
pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns an error if the API key variable is unset or the HTTP client
    /// cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<ChatReply> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": messages,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, delay_secs = delay.as_secs(), "retrying chat request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_anthropic_response(&json, &self.model);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Anthropic API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Anthropic API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat request failed after retries")))
    }
}

/// Parse a Messages API response: the reply is the first content block's text.
fn parse_anthropic_response(json: &serde_json::Value, requested_model: &str) -> Result<ChatReply> {
    let message = json
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: missing content text"))?;

    let usage = json
        .get("usage")
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());

    let model_used = json
        .get("model")
        .and_then(|m| m.as_str())
        .unwrap_or(requested_model)
        .to_string();

    Ok(ChatReply {
        message: message.to_string(),
        usage,
        model_used,
    })
}

/// Create the [`ChatBackend`] named by `config.provider`.
///
/// | Config Value | Backend |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledBackend`] |
/// | `"anthropic"` | [`AnthropicBackend`] |
pub fn create_backend(config: &ChatConfig) -> Result<Box<dyn ChatBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "anthropic" => Ok(Box::new(AnthropicBackend::new(config)?)),
        other => bail!("Unknown chat provider: {}", other),
    }
}
