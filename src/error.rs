use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type
///
/// Covers the failure taxonomy of the messaging core: rejected input,
/// missing threads or messages, and opaque store failures. Push delivery
/// failures never appear here; they are folded into `PushOutcome` at the
/// transport boundary.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Request Errors =====
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    // ===== Storage Errors =====
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Store(String),

    // ===== Internal Server Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    ///
    /// Store failures are reported as 400 with their message, matching the
    /// request surface the mobile clients already handle.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Store(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller
    pub fn user_message(&self) -> String {
        match self {
            AppError::Internal(_) | AppError::Unknown(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if matches!(self, AppError::Database(_) | AppError::Store(_)) {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Store operation failed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Create a store error for non-SQL backends
    pub fn store(msg: impl Into<String>) -> Self {
        AppError::Store(msg.into())
    }

    /// Create an internal server error for a broken invariant
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
