// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST /api/messages/thread - Get or create the thread for a pair
// - GET /api/messages/thread/:thread_id - List a thread's messages
// - POST /api/messages/send - Persist a message and notify the recipient
// - PATCH /api/messages/:message_id/seen - Mark a message as seen
//
// ============================================================================

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::messaging_service::input::{parse_thread_id, required};
use crate::messaging_service::SendMessageInput;
use crate::routes::extractors::ApiJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRequest {
    pub customer_id: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub thread_id: Option<Value>,
    pub sender_type: Option<String>,
    pub sender_id: Option<String>,
    pub content: Option<String>,
}

impl From<SendMessageRequest> for SendMessageInput {
    fn from(req: SendMessageRequest) -> Self {
        SendMessageInput {
            thread_id: req.thread_id,
            sender_type: req.sender_type,
            sender_id: req.sender_id,
            content: req.content,
        }
    }
}

/// POST /api/messages/thread
pub async fn get_or_create_thread(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<ThreadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (customer_id, provider_id) = required(req.customer_id, "customerId")
        .and_then(|c| required(req.provider_id, "providerId").map(|p| (c, p)))
        .map_err(|_| AppError::validation("customerId and providerId are required"))?;

    let thread = ctx.threads.get_or_create(&customer_id, &provider_id).await?;
    Ok(Json(thread))
}

/// GET /api/messages/thread/:thread_id
pub async fn list_messages(
    State(ctx): State<Arc<AppContext>>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let thread_id = parse_thread_id(Some(&Value::String(thread_id)))?;

    let messages = ctx.messages.list(thread_id).await?;
    tracing::debug!(thread_id = thread_id, count = messages.len(), "Messages listed");

    Ok(Json(messages))
}

/// POST /api/messages/send
pub async fn send_message(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = ctx.messaging.send(req.into()).await?;
    Ok(Json(message))
}

/// PATCH /api/messages/:message_id/seen
pub async fn mark_seen(
    State(ctx): State<Arc<AppContext>>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let message_id = message_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation("messageId must be a positive integer"))?;

    let message = ctx.messages.mark_seen(message_id).await?;
    Ok(Json(message))
}
