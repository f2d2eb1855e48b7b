use std::sync::Arc;
use std::time::Duration;

use super::types::{PushMessage, PushOutcome};
use super::PushTransport;
use crate::device_tokens::DeviceTokenDirectory;
use crate::metrics;
use crate::utils::token_fingerprint;

/// Sends one notification and applies the stale-token side effect
pub struct PushDispatcher {
    transport: Arc<dyn PushTransport>,
    directory: Arc<DeviceTokenDirectory>,
    send_timeout: Duration,
}

impl PushDispatcher {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        directory: Arc<DeviceTokenDirectory>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            directory,
            send_timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_enabled()
    }

    /// Deliver `message`. A stale registration removes the token before
    /// returning; no other outcome changes state.
    pub async fn send(&self, message: &PushMessage) -> PushOutcome {
        let token_fp = token_fingerprint(&message.token);

        if !self.transport.is_enabled() {
            tracing::debug!(token_fp = %token_fp, "Push disabled, skipping send");
            return PushOutcome::failed("push delivery is disabled");
        }

        let outcome = match tokio::time::timeout(self.send_timeout, self.transport.send(message))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => PushOutcome::failed(format!(
                "{} send timed out after {} ms",
                self.transport.name(),
                self.send_timeout.as_millis()
            )),
        };

        match &outcome {
            PushOutcome::Delivered { id } => {
                metrics::PUSH_DELIVERED_TOTAL.inc();
                tracing::info!(
                    transport = self.transport.name(),
                    token_fp = %token_fp,
                    delivery_id = %id,
                    "Push notification delivered"
                );
            }
            PushOutcome::StaleRegistration => {
                metrics::PUSH_FAILED_TOTAL.inc();
                tracing::warn!(
                    transport = self.transport.name(),
                    token_fp = %token_fp,
                    "Device token no longer registered, pruning"
                );
                self.prune(&message.token, &token_fp).await;
            }
            PushOutcome::Failed { detail } => {
                metrics::PUSH_FAILED_TOTAL.inc();
                tracing::warn!(
                    transport = self.transport.name(),
                    token_fp = %token_fp,
                    error = %detail,
                    "Push notification failed"
                );
            }
        }

        outcome
    }

    async fn prune(&self, token: &str, token_fp: &str) {
        match self.directory.remove(token).await {
            Ok(removed) if removed > 0 => {
                metrics::PUSH_TOKENS_PRUNED_TOTAL.inc_by(removed);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    token_fp = %token_fp,
                    error = %e,
                    "Failed to prune stale device token"
                );
            }
        }
    }
}
