//! HTTP API server.
//!
//! Serves the relevance index and the retrieval-augmented chat endpoint to
//! the site's browser client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/entries?q=&limit=` | Scored entries for `q`, or every entry without it |
//! | `GET`  | `/api/team` | Contributor statistics |
//! | `POST` | `/api/index/rebuild` | Re-read the site page and rebuild the index |
//! | `POST` | `/api/chat` | Retrieval-augmented chat completion |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Messages array is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `chat_disabled` (400), `internal` (500).
//!
//! # Concurrency
//!
//! The index sits behind a [`tokio::sync::RwLock`]. A rebuild parses and
//! indexes the new page without holding the lock, then swaps the result in
//! under a short write lock, so readers see either the old or the new
//! collection. The lock is never held across the chat backend call.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use research_exchange_core::index::ResearchIndex;
use research_exchange_core::models::{Entry, EntrySummary, ScoredEntry, TeamData};
use research_exchange_core::prompt::{build_system_prompt, last_user_message, ChatMessage};
use research_exchange_core::tree::DocumentTree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::{create_backend, ChatBackend, ChatReply};
use crate::config::Config;
use crate::html::load_index;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    index: Arc<RwLock<ResearchIndex<DocumentTree>>>,
    backend: Arc<dyn ChatBackend>,
}

impl AppState {
    /// `index` should already be built; handlers never build lazily.
    pub fn new(
        config: Config,
        index: ResearchIndex<DocumentTree>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(RwLock::new(index)),
            backend,
        }
    }
}

/// Starts the HTTP server.
///
/// Builds the index from `[site].index` before binding `[server].bind`,
/// so the first request is always served from a ready index.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let index = load_index(config).await?;
    let backend: Arc<dyn ChatBackend> = Arc::from(create_backend(&config.chat)?);

    let count = index.index().entries().len();
    let state = AppState::new(config.clone(), index, backend);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %config.server.bind,
        entries = count,
        chat = %config.chat.provider,
        "research exchange server listening"
    );
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// The application's routes with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/entries", get(handle_entries))
        .route("/api/team", get(handle_team))
        .route("/api/index/rebuild", post(handle_rebuild))
        .route("/api/chat", post(handle_chat))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn chat_disabled() -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "chat_disabled".to_string(),
        message: "chat is disabled; set [chat].provider in config".to_string(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    service: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/entries ============

#[derive(Deserialize)]
struct EntriesParams {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct EntriesResponse<T> {
    count: usize,
    entries: Vec<T>,
}

impl<T> From<Vec<T>> for EntriesResponse<T> {
    fn from(entries: Vec<T>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// With `q`, the top `limit` scored entries (`[retrieval].default_limit`
/// when omitted). Without it, every entry in document order.
async fn handle_entries(
    State(state): State<AppState>,
    Query(params): Query<EntriesParams>,
) -> Result<Response, AppError> {
    let index = state.index.read().await;

    let Some(q) = params.q else {
        let all: Vec<Entry> = index.index().entries().to_vec();
        return Ok(Json(EntriesResponse::from(all)).into_response());
    };

    let limit = params.limit.unwrap_or(state.config.retrieval.default_limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }

    let hits: Vec<ScoredEntry> = index.index().query(&q, limit);
    Ok(Json(EntriesResponse::from(hits)).into_response())
}

// ============ GET /api/team ============

async fn handle_team(State(state): State<AppState>) -> Json<TeamData> {
    Json(state.index.read().await.team_data())
}

// ============ POST /api/index/rebuild ============

#[derive(Serialize)]
struct RebuildResponse {
    entries: usize,
    skipped: usize,
}

async fn handle_rebuild(State(state): State<AppState>) -> Result<Json<RebuildResponse>, AppError> {
    let fresh = load_index(&state.config).await.map_err(|e| {
        tracing::error!(error = %e, "index rebuild failed");
        internal(format!("rebuild failed: {}", e))
    })?;

    let response = RebuildResponse {
        entries: fresh.index().entries().len(),
        skipped: fresh.index().skipped(),
    };
    *state.index.write().await = fresh;

    tracing::info!(entries = response.entries, skipped = response.skipped, "index rebuilt");
    Ok(Json(response))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    messages: Option<serde_json::Value>,
    #[serde(default)]
    entries: Option<Vec<EntrySummary>>,
    #[serde(default)]
    team_data: Option<TeamData>,
}

/// Answers the conversation in `messages`.
///
/// When the client sends no `entries`, the last user message is run
/// against the index (`[retrieval].chat_limit` results); when it sends no
/// `teamData`, statistics are read from the site page.
async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;

    let messages = parse_messages(request.messages)?;

    if !state.backend.is_enabled() {
        return Err(chat_disabled());
    }

    let system = {
        let index = state.index.read().await;
        let entries = match request.entries {
            Some(entries) => entries,
            None => match last_user_message(&messages) {
                Some(question) => index
                    .index()
                    .query(question, state.config.retrieval.chat_limit)
                    .iter()
                    .map(EntrySummary::from)
                    .collect(),
                None => Vec::new(),
            },
        };
        let team = request.team_data.unwrap_or_else(|| index.team_data());
        build_system_prompt(&entries, Some(&team))
    };

    let reply = state
        .backend
        .complete(&system, &messages)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "chat backend call failed");
            internal("Failed to get response from AI")
        })?;

    Ok(Json(reply))
}

fn parse_messages(raw: Option<serde_json::Value>) -> Result<Vec<ChatMessage>, AppError> {
    let required = || bad_request("Messages array is required");

    let raw = raw.ok_or_else(required)?;
    if !raw.as_array().is_some_and(|a| !a.is_empty()) {
        return Err(required());
    }
    serde_json::from_value(raw).map_err(|e| bad_request(format!("invalid messages: {}", e)))
}
