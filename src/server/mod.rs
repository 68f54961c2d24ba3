//! HTTP surface — serves the assistant under `/api/`.
//!
//! ## URL layout
//!
//! ```text
//! GET  /            — root HTML page
//! GET  /api/health
//! POST /api/chat    — conversational agent turn
//! POST /api/ask     — document-index question
//! ```
//!
//! The axum event loop is wired to a [`CancellationToken`] for graceful
//! shutdown.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::AppError;

/// Simple welcome page served at the root path.
const ROOT_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Medibot</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      display: flex; align-items: center; justify-content: center;
      height: 100vh;
    }
    .card {
      text-align: center; padding: 2rem 3rem;
      border: 1px solid #333; border-radius: 12px;
      background: #1a1a1a;
    }
    h1 { font-size: 1.5rem; margin-bottom: 0.5rem; }
    p  { font-size: 0.9rem; color: #888; }
    code { color: #c0c0e0; }
  </style>
</head>
<body>
  <div class="card">
    <h1>Medibot</h1>
    <p>Assistant is running. POST to <code>/api/chat</code> or <code>/api/ask</code>.</p>
  </div>
</body>
</html>
"#;

#[derive(Clone)]
struct ServerState {
    engine: Arc<Engine>,
}

/// Run the HTTP surface until `shutdown` fires.
pub async fn run_http(
    engine: Arc<Engine>,
    bind_addr: &str,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let state = ServerState { engine };
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("http bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http surface listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("http server error: {e}")))
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/ask", post(ask))
        .with_state(state)
}

async fn root() -> Html<&'static str> {
    Html(ROOT_INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    bot: String,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        bot: state.engine.bot_name().to_string(),
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    /// Omitted on the first turn; the server mints one and returns it.
    session_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
}

async fn chat(
    State(state): State<ServerState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

    match state.engine.chat(&session_id, &req.message).await {
        Ok(reply) => Ok(Json(ChatResponse { session_id, reply })),
        Err(e) => Err(internal(e)),
    }
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn ask(
    State(state): State<ServerState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    match state.engine.ask(&req.question).await {
        Ok(answer) => Ok(Json(AskResponse { answer })),
        Err(e) => Err(internal(e)),
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg.to_string() }))
}

fn internal(e: AppError) -> (StatusCode, Json<ErrorResponse>) {
    warn!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: e.to_string() }),
    )
}
