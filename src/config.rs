//! TOML configuration.
//!
//! See `config/rx.example.toml` for every key with its default.

use anyhow::{Context, Result};
use research_exchange_core::extract::ExtractorConfig;
use research_exchange_core::index::DEFAULT_MAX_RESULTS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Rendered HTML page holding the bibliography.
    pub index: PathBuf,
    /// Overrides `extractor.base_path` when set.
    #[serde(default)]
    pub base_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_chat_limit")]
    pub chat_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            chat_limit: default_chat_limit(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_chat_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_url")]
    pub url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            url: default_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// A config pointing at `index` with every other setting defaulted.
    pub fn for_site(index: impl Into<PathBuf>) -> Self {
        Self {
            site: SiteConfig {
                index: index.into(),
                base_path: None,
            },
            extractor: ExtractorConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Extractor settings with `site.base_path` applied.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let mut extractor = self.extractor.clone();
        if let Some(base) = &self.site.base_path {
            extractor.base_path = base.clone();
        }
        extractor
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.default_limit < 1 {
        anyhow::bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.chat_limit < 1 {
        anyhow::bail!("retrieval.chat_limit must be >= 1");
    }

    if config.chat.max_tokens == 0 {
        anyhow::bail!("chat.max_tokens must be > 0");
    }

    match config.chat.provider.as_str() {
        "disabled" | "anthropic" => {}
        other => anyhow::bail!(
            "Unknown chat provider: '{}'. Must be disabled or anthropic.",
            other
        ),
    }

    Ok(())
}
