// ============================================================================
// Catalog Routes
// ============================================================================
//
// Endpoints:
// - GET /api/providers - List providers
// - GET /api/providers/:id - One provider
// - POST /api/reviews - Submit a review
// - GET /api/reviews/service/:id - Reviews of a service, newest first
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::messaging_service::input::required;
use crate::models::NewReview;
use crate::routes::extractors::ApiJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub customer_id: Option<String>,
    pub service_id: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// GET /api/providers
pub async fn list_providers(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ctx.catalog.list_providers().await?))
}

/// GET /api/providers/:id
pub async fn get_provider(
    State(ctx): State<Arc<AppContext>>,
    Path(provider_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ctx.catalog.provider(&provider_id).await?))
}

/// POST /api/reviews
pub async fn create_review(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let review = NewReview {
        customer_id: required(req.customer_id, "customerId")?,
        service_id: required(req.service_id, "serviceId")?,
        rating: req
            .rating
            .ok_or_else(|| AppError::validation("rating is required"))?,
        comment: req.comment,
    };

    let review = ctx.catalog.create_review(review).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/service/:id
pub async fn reviews_for_service(
    State(ctx): State<Arc<AppContext>>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ctx.catalog.reviews_for_service(&service_id).await?))
}
