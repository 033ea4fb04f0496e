//! Route handlers.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::request::ClientId;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::Message;

/// Number of characters of a new message included in the log line.
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageCreated {
    pub ok: bool,
    pub message: Message,
}

/// GET /
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        timestamp: Utc::now(),
    })
}

/// GET /api/guestbook
pub async fn list_messages(State(state): State<AppState>) -> Json<MessageList> {
    let messages = state.messages.list();
    Json(MessageList {
        count: messages.len(),
        messages,
    })
}

/// POST /api/guestbook
///
/// A body that is not JSON, lacks `msg`, or sanitizes to nothing is
/// rejected as invalid input.
pub async fn add_message(
    State(state): State<AppState>,
    client: ClientId,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<MessageCreated>), ApiError> {
    let body = body?;
    let payload: Option<Value> = serde_json::from_slice(&body).ok();
    let text = state
        .sanitizer
        .sanitize_value(payload.as_ref().and_then(|p| p.get("msg")));

    if text.is_empty() {
        metrics::record_message_rejected();
        tracing::debug!(client = %client, "Rejected empty or invalid message");
        return Err(ApiError::InvalidInput);
    }

    let message = state.messages.append(text);
    metrics::record_message_accepted(state.messages.len());

    let preview: String = message.msg.chars().take(LOG_PREVIEW_CHARS).collect();
    tracing::info!(client = %client, id = message.id, preview = %preview, "New message added");

    Ok((StatusCode::CREATED, Json(MessageCreated { ok: true, message })))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
