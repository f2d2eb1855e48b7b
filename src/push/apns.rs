use a2::{
    Client, ClientConfig, DefaultNotificationBuilder, Endpoint, ErrorReason, NotificationBuilder,
    NotificationOptions, Priority,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::BufReader;

use super::types::{PushMessage, PushOutcome, PushPriority};
use super::PushTransport;
use crate::config::{ApnsConfig, ApnsEnvironment};
use crate::utils::token_fingerprint;

/// APNs transport using token (.p8) authentication
pub struct ApnsTransport {
    client: Client,
    topic: String,
}

impl ApnsTransport {
    pub fn new(config: &ApnsConfig) -> Result<Self> {
        tracing::info!(
            "Initializing APNs client (environment: {:?})",
            config.environment
        );

        let key_file = File::open(&config.key_path)
            .with_context(|| format!("Failed to open APNs key file: {}", config.key_path))?;
        let key_reader = BufReader::new(key_file);

        let endpoint = match config.environment {
            ApnsEnvironment::Production => Endpoint::Production,
            ApnsEnvironment::Development => Endpoint::Sandbox,
        };

        let client = Client::token(
            key_reader,
            &config.key_id,
            &config.team_id,
            ClientConfig::new(endpoint),
        )
        .with_context(|| "Failed to create APNs client")?;

        tracing::info!(
            key_id = %config.key_id,
            team_id = %config.team_id,
            "APNs client initialized"
        );

        Ok(Self {
            client,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl PushTransport for ApnsTransport {
    async fn send(&self, message: &PushMessage) -> PushOutcome {
        let priority = match message.priority {
            PushPriority::High => Priority::High,
            PushPriority::Normal => Priority::Normal,
        };
        let options = NotificationOptions {
            apns_topic: Some(&self.topic),
            apns_priority: Some(priority),
            ..Default::default()
        };

        let mut payload = DefaultNotificationBuilder::new()
            .set_title(&message.title)
            .set_body(&message.body)
            .set_sound("default")
            .build(&message.token, options);

        if let Err(e) = payload.add_custom_data("data", &message.data) {
            return PushOutcome::failed(format!("Failed to encode APNs payload: {}", e));
        }

        match self.client.send(payload).await {
            Ok(response) => PushOutcome::Delivered {
                id: response.apns_id.unwrap_or_default(),
            },
            Err(a2::Error::ResponseError(response)) => {
                let reason = response.error.as_ref().map(|body| &body.reason);
                tracing::debug!(
                    token_fp = %token_fingerprint(&message.token),
                    code = response.code,
                    reason = ?reason,
                    "APNs rejected notification"
                );
                classify_rejection(response.code, reason)
            }
            Err(e) => PushOutcome::failed(format!("APNs request failed: {}", e)),
        }
    }

    fn name(&self) -> &'static str {
        "apns"
    }
}

/// 410 and the token-specific reasons mean the device is gone
fn classify_rejection(code: u16, reason: Option<&ErrorReason>) -> PushOutcome {
    let stale_reason = matches!(
        reason,
        Some(ErrorReason::Unregistered) | Some(ErrorReason::BadDeviceToken)
    );
    if code == 410 || stale_reason {
        return PushOutcome::StaleRegistration;
    }

    match reason {
        Some(reason) => PushOutcome::failed(format!("APNs {}: {:?}", code, reason)),
        None => PushOutcome::failed(format!("APNs {}", code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_devices_are_stale() {
        assert_eq!(
            classify_rejection(410, Some(&ErrorReason::Unregistered)),
            PushOutcome::StaleRegistration
        );
        assert_eq!(classify_rejection(410, None), PushOutcome::StaleRegistration);
        assert_eq!(
            classify_rejection(400, Some(&ErrorReason::BadDeviceToken)),
            PushOutcome::StaleRegistration
        );
    }

    #[test]
    fn other_rejections_are_failures() {
        match classify_rejection(429, Some(&ErrorReason::TooManyRequests)) {
            PushOutcome::Failed { detail } => assert!(detail.contains("429")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(matches!(
            classify_rejection(500, None),
            PushOutcome::Failed { .. }
        ));
    }

    #[test]
    fn missing_key_file_fails_initialization() {
        let config = ApnsConfig {
            environment: ApnsEnvironment::Development,
            key_path: "/nonexistent/AuthKey.p8".to_string(),
            key_id: "ABC123DEFG".to_string(),
            team_id: "TEAM123456".to_string(),
            topic: "com.example.app".to_string(),
        };
        assert!(ApnsTransport::new(&config).is_err());
    }
}
