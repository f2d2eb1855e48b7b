// ============================================================================
// Device Token Directory
// ============================================================================
//
// One registration per user, keyed by user id. Registering a token that
// another user holds moves it to the new user. Multi-device delivery would
// change the key to (user_id, token) and make `lookup` return every row.
//
// ============================================================================

use std::sync::Arc;

use crate::config::MAX_DEVICE_TOKEN_LENGTH;
use crate::error::{AppError, AppResult};
use crate::models::DeviceToken;
use crate::storage::DeviceTokenRepository;
use crate::utils::{token_fingerprint, LogIds};

pub struct DeviceTokenDirectory {
    repo: Arc<dyn DeviceTokenRepository>,
    log_ids: LogIds,
}

impl DeviceTokenDirectory {
    pub fn new(repo: Arc<dyn DeviceTokenRepository>, log_ids: LogIds) -> Self {
        Self { repo, log_ids }
    }

    /// Tokens on file for `user_id`; empty when the user never registered
    pub async fn lookup(&self, user_id: &str) -> AppResult<Vec<String>> {
        let tokens = self.repo.tokens_for_user(user_id).await?;
        Ok(tokens.into_iter().map(|t| t.token).collect())
    }

    pub async fn upsert(&self, user_id: &str, token: &str) -> AppResult<DeviceToken> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("userId is required"));
        }
        validate_token(token)?;

        let record = self.repo.upsert_for_user(user_id, token).await?;

        tracing::info!(
            user = %self.log_ids.user(user_id),
            token_fp = %token_fingerprint(token),
            "Device token registered"
        );

        Ok(record)
    }

    /// Idempotent: removing an unknown token succeeds
    pub async fn remove(&self, token: &str) -> AppResult<u64> {
        if token.trim().is_empty() {
            return Err(AppError::validation("token is required"));
        }

        let removed = self.repo.delete_token(token).await?;

        tracing::info!(
            token_fp = %token_fingerprint(token),
            removed = removed,
            "Device token removed"
        );

        Ok(removed)
    }
}

fn validate_token(token: &str) -> AppResult<()> {
    if token.trim().is_empty() {
        return Err(AppError::validation("token is required"));
    }
    if token.len() > MAX_DEVICE_TOKEN_LENGTH {
        return Err(AppError::validation(format!(
            "token exceeds maximum length of {} bytes",
            MAX_DEVICE_TOKEN_LENGTH
        )));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AppError::validation("token must not contain whitespace"));
    }
    Ok(())
}
