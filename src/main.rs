//! # Research Exchange CLI (`rx`)
//!
//! Builds the relevance index from the site's rendered page and exposes it
//! for searching, prompt inspection, one-shot chat, and the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! rx --config ./config/rx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rx index` | Build the index and print entry/skip counts |
//! | `rx search "<query>"` | Ranked results |
//! | `rx list` | Every indexed entry |
//! | `rx team` | Contributor statistics |
//! | `rx prompt "<question>"` | Print the assembled system prompt |
//! | `rx ask "<question>"` | One-shot retrieval-augmented chat |
//! | `rx serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=debug`) to adjust.

use clap::{Parser, Subcommand};
use research_exchange::{ask, config, search, server};
use std::path::PathBuf;

/// Research Exchange CLI: keyword relevance search and retrieval-augmented
/// chat over the research exchange bibliography.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rx",
    about = "Research Exchange: relevance search and retrieval-augmented chat over the research bibliography",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entries from the site page and report counts.
    Index,

    /// Search indexed entries.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (defaults to `[retrieval].default_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every indexed entry in document order.
    List {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show contributor statistics from the team list.
    Team,

    /// Print the system prompt that would ground a question.
    ///
    /// Runs retrieval with `[retrieval].chat_limit` and never calls the
    /// chat backend.
    Prompt {
        question: String,
    },

    /// Ask the configured chat backend a single question.
    Ask {
        question: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index => {
            search::run_index(&cfg).await?;
        }
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::List { json } => {
            search::run_list(&cfg, json).await?;
        }
        Commands::Team => {
            search::run_team(&cfg).await?;
        }
        Commands::Prompt { question } => {
            ask::run_prompt(&cfg, &question).await?;
        }
        Commands::Ask { question } => {
            ask::run_ask(&cfg, &question).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
