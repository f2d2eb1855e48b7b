use std::collections::BTreeMap;

use crate::models::Message;
use crate::recipient::Recipient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPriority {
    High,
    Normal,
}

/// One notification addressed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// String-valued so it maps onto FCM `data` without conversion
    pub data: BTreeMap<String, String>,
    pub priority: PushPriority,
}

impl PushMessage {
    /// Notification for a newly persisted chat message.
    ///
    /// The data block carries enough for the client to open the thread
    /// without fetching anything first.
    pub fn for_new_message(token: &str, message: &Message, recipient: &Recipient) -> Self {
        let title = format!("New message from {}", recipient.display_name);
        let body = message.content.clone();

        let mut data = BTreeMap::new();
        data.insert("title".to_string(), title.clone());
        data.insert("body".to_string(), body.clone());
        data.insert("threadId".to_string(), message.thread_id.to_string());
        data.insert("messageId".to_string(), message.id.to_string());
        data.insert("senderId".to_string(), message.sender_id.clone());
        data.insert(
            "senderType".to_string(),
            message.sender_type.as_str().to_string(),
        );
        data.insert("senderName".to_string(), recipient.display_name.clone());
        data.insert(
            "providerName".to_string(),
            recipient.provider_name.clone(),
        );
        data.insert(
            "customerName".to_string(),
            recipient.customer_name.clone(),
        );
        data.insert("content".to_string(), message.content.clone());
        data.insert("profileUrl".to_string(), recipient.profile_url.clone());

        Self {
            token: token.to_string(),
            title,
            body,
            data,
            priority: PushPriority::High,
        }
    }
}

/// Result of handing one message to a push transport.
///
/// Decided once at the transport boundary; callers never inspect raw
/// provider errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Accepted; the id is opaque and only logged
    Delivered { id: String },
    /// The token no longer identifies a reachable device
    StaleRegistration,
    Failed { detail: String },
}

impl PushOutcome {
    pub fn failed(detail: impl Into<String>) -> Self {
        PushOutcome::Failed {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PushOutcome::Delivered { .. } => "delivered",
            PushOutcome::StaleRegistration => "stale_registration",
            PushOutcome::Failed { .. } => "failed",
        }
    }
}
