// ============================================================================
// Device Token Routes
// ============================================================================
//
// Endpoints:
// - POST /api/device-tokens/register - Register a token for a user
// - POST /api/device-tokens/remove - Remove a token (logout)
// - POST /api/notifications/refresh-token - Register, legacy field names
//
// All three go through the same user-keyed upsert.
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::messaging_service::input::required;
use crate::routes::extractors::ApiJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTokenRequest {
    pub token: Option<String>,
}

/// Older clients send `UserID`/`Token`
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(rename = "UserID", alias = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "Token", alias = "token")]
    pub token: Option<String>,
}

/// POST /api/device-tokens/register
pub async fn register_token(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<RegisterTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = required(req.user_id, "userId")?;
    let token = required(req.token, "token")?;

    let record = ctx.device_tokens.upsert(&user_id, &token).await?;

    Ok(Json(json!({ "success": true, "token": record })))
}

/// POST /api/device-tokens/remove
pub async fn remove_token(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<RemoveTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = required(req.token, "token")?;

    ctx.device_tokens.remove(&token).await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /api/notifications/refresh-token
pub async fn refresh_token(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = required(req.user_id, "UserID")?;
    let token = required(req.token, "Token")?;

    ctx.device_tokens.upsert(&user_id, &token).await?;

    Ok(StatusCode::OK)
}
