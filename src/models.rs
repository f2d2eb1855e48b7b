use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ThreadId = i64;
pub type MessageId = i64;

/// Which side of a thread authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SenderType {
    Customer,
    Provider,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "Customer",
            SenderType::Provider => "Provider",
        }
    }
}

impl std::fmt::Display for SenderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(SenderType::Customer),
            "Provider" => Ok(SenderType::Provider),
            other => Err(format!(
                "senderType must be 'Customer' or 'Provider', got '{}'",
                other
            )),
        }
    }
}

/// The single conversation between one customer and one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub customer_id: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    /// The counter-party of `sender`
    pub fn recipient_of(&self, sender: SenderType) -> &str {
        match sender {
            SenderType::Customer => &self.provider_id,
            SenderType::Provider => &self.customer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub sender_type: SenderType,
    pub sender_id: String,
    pub content: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated input for appending a message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub sender_type: SenderType,
    pub sender_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub user_id: String,
    pub token: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub full_name: Option<String>,
    pub profile_url: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub customer_id: String,
    pub service_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub customer_id: String,
    pub service_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}
