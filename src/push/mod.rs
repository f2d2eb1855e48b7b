// ============================================================================
// Push Notifications
// ============================================================================
//
// - types.rs: PushMessage and the closed PushOutcome
// - fcm.rs: Firebase Cloud Messaging HTTP v1 transport
// - apns.rs: APNs token-auth transport (a2)
// - dispatcher.rs: PushDispatcher (send, classify, prune stale tokens)
//
// A transport is built once at startup from PushConfig and injected into
// the dispatcher.
//
// ============================================================================

pub mod apns;
pub mod dispatcher;
pub mod fcm;
pub mod types;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{PushConfig, PushProvider};

pub use apns::ApnsTransport;
pub use dispatcher::PushDispatcher;
pub use fcm::FcmTransport;
pub use types::{PushMessage, PushOutcome, PushPriority};

/// Delivery service that accepts one message for one device token
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Never errors: every failure is classified into `PushOutcome`
    async fn send(&self, message: &PushMessage) -> PushOutcome;

    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no push provider is configured
pub struct DisabledTransport;

#[async_trait]
impl PushTransport for DisabledTransport {
    async fn send(&self, _message: &PushMessage) -> PushOutcome {
        PushOutcome::failed("push delivery is disabled")
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Build the transport selected by `PUSH_PROVIDER`
pub fn build_transport(config: &PushConfig) -> Result<Arc<dyn PushTransport>> {
    let transport: Arc<dyn PushTransport> = match config.provider {
        PushProvider::Fcm => {
            let fcm = config
                .fcm
                .as_ref()
                .context("PUSH_PROVIDER=fcm but FCM is not configured")?;
            Arc::new(FcmTransport::new(fcm).context("Failed to initialize FCM transport")?)
        }
        PushProvider::Apns => {
            let apns = config
                .apns
                .as_ref()
                .context("PUSH_PROVIDER=apns but APNs is not configured")?;
            Arc::new(ApnsTransport::new(apns).context("Failed to initialize APNs transport")?)
        }
        PushProvider::Disabled => Arc::new(DisabledTransport),
    };

    tracing::info!(
        transport = transport.name(),
        enabled = transport.is_enabled(),
        "Push transport initialized"
    );

    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_disabled_transport() {
        let transport = build_transport(&PushConfig::default()).unwrap();
        assert_eq!(transport.name(), "disabled");
        assert!(!transport.is_enabled());
    }

    #[test]
    fn fcm_without_credentials_fails_startup() {
        let config = PushConfig {
            provider: PushProvider::Fcm,
            fcm: None,
            apns: None,
        };
        assert!(build_transport(&config).is_err());
    }
}
