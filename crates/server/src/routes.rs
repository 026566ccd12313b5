//! Route handlers.

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const CHAT_PAGE: &str = include_str!("../templates/chat.html");

const NO_MESSAGE: &str = "No message provided";

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Chat routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/get", post(chat))
        .route("/health", get(health))
}

/// GET / - Static chat page.
async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// POST /get - Answer a question from the indexed documents.
async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let message =
        extract_message(&body).ok_or_else(|| ApiError::BadRequest(NO_MESSAGE.to_string()))?;

    let response = state.rag.answer(&message).await.map_err(|e| {
        tracing::error!("Answer failed: {}", e);
        ApiError::internal(e)
    })?;

    Ok(Json(ChatResponse {
        answer: response.answer,
    }))
}

/// GET /health - Liveness and index size.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "chunks": state.rag.retriever().index_len(),
    }))
}

/// The non-empty string `message` of a JSON body, if there is one.
fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
