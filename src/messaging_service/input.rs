// ============================================================================
// Send Message Input
// ============================================================================
//
// Transport-independent input for the send use case. Every field arrives
// optional so a missing field is reported as a validation error instead of
// a deserialization failure.
//
// ============================================================================

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{SenderType, ThreadId};

#[derive(Debug, Clone, Default)]
pub struct SendMessageInput {
    /// Number or numeric string, as clients send both
    pub thread_id: Option<Value>,
    pub sender_type: Option<String>,
    pub sender_id: Option<String>,
    pub content: Option<String>,
}

/// A send request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub thread_id: ThreadId,
    pub sender_type: SenderType,
    pub sender_id: String,
    pub content: String,
}

impl SendMessageInput {
    /// Validating step: all four fields present and well-formed.
    ///
    /// Content limits are checked separately by the message store.
    pub fn validate(self) -> AppResult<SendMessageCommand> {
        let thread_id = parse_thread_id(self.thread_id.as_ref())?;

        let sender_type = match self.sender_type.as_deref() {
            None | Some("") => return Err(AppError::validation("senderType is required")),
            Some(raw) => raw.parse::<SenderType>().map_err(AppError::Validation)?,
        };

        let sender_id = required(self.sender_id, "senderId")?;
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::validation("content is required"))?;

        Ok(SendMessageCommand {
            thread_id,
            sender_type,
            sender_id,
            content,
        })
    }
}

pub fn parse_thread_id(value: Option<&Value>) -> AppResult<ThreadId> {
    let id = match value {
        None | Some(Value::Null) => return Err(AppError::validation("threadId is required")),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    id.filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation("threadId must be a positive integer"))
}

pub fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{} is required", field)))
}
