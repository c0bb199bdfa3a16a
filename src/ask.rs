//! Retrieval-augmented chat from the command line.
//!
//! `rx prompt` prints the system message that would ground a question
//! without calling any backend; `rx ask` sends it, along with the question,
//! to the configured [`ChatBackend`](crate::chat::ChatBackend).

use anyhow::{bail, Result};
use research_exchange_core::models::EntrySummary;
use research_exchange_core::prompt::{build_system_prompt, ChatMessage};

use crate::chat::create_backend;
use crate::config::Config;
use crate::html::load_index;

/// Retrieve context for `question` and assemble the system prompt.
pub async fn assemble_prompt(config: &Config, question: &str) -> Result<String> {
    let index = load_index(config).await?;
    let entries: Vec<EntrySummary> = index
        .index()
        .query(question, config.retrieval.chat_limit)
        .iter()
        .map(EntrySummary::from)
        .collect();
    tracing::debug!(retrieved = entries.len(), "assembled chat context");
    Ok(build_system_prompt(&entries, Some(&index.team_data())))
}

pub async fn run_prompt(config: &Config, question: &str) -> Result<()> {
    print!("{}", assemble_prompt(config, question).await?);
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    let backend = create_backend(&config.chat)?;
    if !backend.is_enabled() {
        bail!("chat is disabled; set [chat].provider in config");
    }

    let system = assemble_prompt(config, question).await?;
    let reply = backend
        .complete(&system, &[ChatMessage::user(question)])
        .await?;

    println!("{}", reply.message);
    if let Some(usage) = reply.usage {
        tracing::info!(
            model = %reply.model_used,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "chat completion"
        );
    }
    Ok(())
}
