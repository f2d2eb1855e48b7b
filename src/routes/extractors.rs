// ============================================================================
// Axum Extractors
// ============================================================================
//
// - ApiJson: JSON body whose rejections become 400 AppError responses
//
// ============================================================================

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json<T>` with the service's error body on rejection.
///
/// Malformed JSON, a wrong content type, or a type mismatch are all client
/// errors and are reported as `VALIDATION_ERROR` with status 400.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::validation(rejection.body_text())),
        }
    }
}
