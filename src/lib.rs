//! # Research Exchange
//!
//! Keyword relevance search and retrieval-augmented chat over the research
//! exchange site's rendered bibliography.
//!
//! The I/O-free core (entry model, content tree, extractor, relevance index,
//! prompt assembly) lives in the `research-exchange-core` crate. This crate
//! adds everything that touches the outside world: TOML configuration, HTML
//! loading, the chat backend client, the HTTP server and the `rx` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ index.html │──▶│ DocumentTree │──▶│ EntriesIndex │
//! │  (scraper) │   │  + Extractor │   │   (scoring)  │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │
//!                      ┌─────────────────────┤
//!                      ▼                     ▼
//!                 ┌──────────┐         ┌───────────┐
//!                 │   CLI    │         │   HTTP    │──▶ ChatBackend
//!                 │   (rx)   │         │  (axum)   │
//!                 └──────────┘         └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rx index                         # extract entries, print counts
//! rx search "academic integrity"   # ranked results
//! rx prompt "who wrote about ethics?"
//! rx serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`html`] | HTML page → content tree |
//! | [`chat`] | Chat backend abstraction |
//! | [`search`] | Index-reading commands |
//! | [`ask`] | Prompt assembly and one-shot chat |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod chat;
pub mod config;
pub mod html;
pub mod search;
pub mod server;
