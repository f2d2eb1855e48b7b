// ============================================================================
// FCM Transport
// ============================================================================
//
// Firebase Cloud Messaging HTTP v1. Auth is an OAuth2 access token minted
// from the service account: an RS256 JWT assertion is exchanged at the
// account's token_uri and the result is cached until shortly before expiry.
//
// ============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::types::{PushMessage, PushOutcome, PushPriority};
use super::PushTransport;
use crate::config::FcmConfig;
use crate::utils::token_fingerprint;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the access token actually expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: Option<String>,
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    /// Unix seconds after which the token must be re-minted
    refresh_at: i64,
}

pub struct FcmTransport {
    http: reqwest::Client,
    encoding_key: EncodingKey,
    client_email: String,
    token_uri: String,
    send_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl FcmTransport {
    pub fn new(config: &FcmConfig) -> Result<Self> {
        let account: ServiceAccount = serde_json::from_str(&config.service_account_json)
            .context("Invalid FCM service account JSON")?;

        let project_id = config
            .project_id
            .clone()
            .or(account.project_id)
            .context("FCM project id missing: set FCM_PROJECT_ID or use a service account with project_id")?;

        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("Invalid private key in FCM service account")?;

        let http = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.endpoint.trim_end_matches('/'),
            project_id
        );

        tracing::info!(project_id = %project_id, "FCM transport configured");

        Ok(Self {
            http,
            encoding_key,
            client_email: account.client_email,
            token_uri: account
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            send_url,
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        if let Some(cached) = self.token.read().await.as_ref() {
            if now < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another sender may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if now < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.mint_access_token(now).await?;
        let value = fresh.access_token.clone();
        *guard = Some(CachedToken {
            value: fresh.access_token,
            refresh_at: refresh_deadline(now, fresh.expires_in),
        });

        tracing::debug!(expires_in = fresh.expires_in, "FCM access token refreshed");
        Ok(value)
    }

    async fn mint_access_token(&self, now: i64) -> Result<TokenResponse> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("Failed to sign FCM OAuth assertion")?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("FCM OAuth token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("FCM OAuth token exchange failed: HTTP {} - {}", status, text);
        }

        response
            .json::<TokenResponse>()
            .await
            .context("Invalid FCM OAuth token response")
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    async fn try_send(&self, message: &PushMessage) -> Result<PushOutcome> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&request_body(message))
            .send()
            .await
            .context("FCM send request failed")?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if status == 401 {
            self.invalidate_token().await;
        }

        Ok(classify_response(status, &text))
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send(&self, message: &PushMessage) -> PushOutcome {
        match self.try_send(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    token_fp = %token_fingerprint(&message.token),
                    error = %format!("{:#}", e),
                    "FCM send failed before reaching the API"
                );
                PushOutcome::failed(format!("{:#}", e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

// `expires_in` comes from the token endpoint, so clamp instead of overflowing
fn refresh_deadline(now: i64, expires_in: i64) -> i64 {
    now.saturating_add(expires_in)
        .saturating_sub(TOKEN_REFRESH_MARGIN_SECS)
}

fn request_body(message: &PushMessage) -> Value {
    let (android_priority, apns_priority) = match message.priority {
        PushPriority::High => ("HIGH", "10"),
        PushPriority::Normal => ("NORMAL", "5"),
    };

    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": {
                "priority": android_priority,
            },
            "apns": {
                "headers": { "apns-priority": apns_priority },
                "payload": { "aps": { "sound": "default" } },
            },
        }
    })
}

/// Map an FCM v1 response onto `PushOutcome`
pub(crate) fn classify_response(status: u16, body: &str) -> PushOutcome {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    if (200..300).contains(&status) {
        let id = parsed
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return PushOutcome::Delivered { id };
    }

    let error = parsed.get("error");
    let unregistered = error
        .and_then(|e| e.get("details"))
        .and_then(Value::as_array)
        .map(|details| {
            details.iter().any(|d| {
                d.get("errorCode").and_then(Value::as_str) == Some("UNREGISTERED")
            })
        })
        .unwrap_or(false);

    if unregistered || status == 404 {
        return PushOutcome::StaleRegistration;
    }

    let detail = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(|m| format!("HTTP {}: {}", status, m))
        .unwrap_or_else(|| format!("HTTP {}", status));
    PushOutcome::Failed { detail }
}
