// ============================================================================
// Recipient Resolution
// ============================================================================
//
// The recipient of a message is the other side of its thread. Display
// metadata for the push body comes from three independent profile reads that
// run concurrently, each under its own timeout. A failed or slow read falls
// back to a default instead of failing the send.
//
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;
use crate::models::{SenderType, Thread};
use crate::storage::ProfileRepository;

pub const FALLBACK_PROVIDER_NAME: &str = "Provider";
pub const FALLBACK_CUSTOMER_NAME: &str = "Customer";

/// Who receives a message and how the sender is presented to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: String,
    /// Sender's name, as shown in the notification title
    pub display_name: String,
    pub provider_name: String,
    pub customer_name: String,
    /// Sender's profile image; empty unless the sender is a provider
    pub profile_url: String,
}

pub struct RecipientResolver {
    profiles: Arc<dyn ProfileRepository>,
    lookup_timeout: Duration,
}

impl RecipientResolver {
    pub fn new(profiles: Arc<dyn ProfileRepository>, lookup_timeout: Duration) -> Self {
        Self {
            profiles,
            lookup_timeout,
        }
    }

    pub async fn resolve(
        &self,
        thread: &Thread,
        sender_type: SenderType,
        sender_id: &str,
    ) -> Recipient {
        let user_id = thread.recipient_of(sender_type).to_string();

        let profile_url = async {
            if sender_type != SenderType::Provider || sender_id.is_empty() {
                return String::new();
            }
            let lookup = self.profiles.provider(sender_id);
            self.bounded("profile_url", async {
                lookup.await.map(|p| p.and_then(|p| p.profile_url))
            })
            .await
            .unwrap_or_default()
        };

        let provider_name = async {
            if thread.provider_id.is_empty() {
                return FALLBACK_PROVIDER_NAME.to_string();
            }
            let lookup = self.profiles.provider(&thread.provider_id);
            self.bounded("provider_name", async {
                lookup.await.map(|p| p.and_then(|p| p.full_name))
            })
            .await
            .unwrap_or_else(|| FALLBACK_PROVIDER_NAME.to_string())
        };

        let customer_name = async {
            if thread.customer_id.is_empty() {
                return FALLBACK_CUSTOMER_NAME.to_string();
            }
            let lookup = self.profiles.customer(&thread.customer_id);
            self.bounded("customer_name", async {
                lookup.await.map(|c| c.and_then(|c| c.full_name))
            })
            .await
            .unwrap_or_else(|| FALLBACK_CUSTOMER_NAME.to_string())
        };

        let (profile_url, provider_name, customer_name) =
            tokio::join!(profile_url, provider_name, customer_name);

        let display_name = match sender_type {
            SenderType::Provider => provider_name.clone(),
            SenderType::Customer => customer_name.clone(),
        };

        Recipient {
            user_id,
            display_name,
            provider_name,
            customer_name,
            profile_url,
        }
    }

    /// Run one lookup under the timeout. Errors, timeouts, and blank values
    /// all come back as `None`.
    async fn bounded<F>(&self, lookup: &'static str, fut: F) -> Option<String>
    where
        F: Future<Output = AppResult<Option<String>>>,
    {
        match tokio::time::timeout(self.lookup_timeout, fut).await {
            Ok(Ok(value)) => value.filter(|v| !v.trim().is_empty()),
            Ok(Err(e)) => {
                tracing::warn!(lookup = lookup, error = %e, "Profile lookup failed, using fallback");
                None
            }
            Err(_) => {
                tracing::warn!(
                    lookup = lookup,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Profile lookup timed out, using fallback"
                );
                None
            }
        }
    }
}
