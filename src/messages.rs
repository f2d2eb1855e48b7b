use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageId, NewMessage, SenderType, ThreadId};
use crate::storage::MessageRepository;

/// Append-only, per-thread ordered message log
pub struct MessageStore {
    repo: Arc<dyn MessageRepository>,
    max_message_length: usize,
}

impl MessageStore {
    pub fn new(repo: Arc<dyn MessageRepository>, max_message_length: usize) -> Self {
        Self {
            repo,
            max_message_length,
        }
    }

    /// Reject content the store must never hold
    pub fn validate_content(&self, content: &str) -> AppResult<()> {
        if content.trim().is_empty() {
            return Err(AppError::validation("content is required"));
        }
        let length = content.chars().count();
        if length > self.max_message_length {
            return Err(AppError::validation(format!(
                "content exceeds maximum length of {} characters",
                self.max_message_length
            )));
        }
        Ok(())
    }

    pub async fn append(
        &self,
        thread_id: ThreadId,
        sender_type: SenderType,
        sender_id: &str,
        content: &str,
    ) -> AppResult<Message> {
        if sender_id.trim().is_empty() {
            return Err(AppError::validation("senderId is required"));
        }
        self.validate_content(content)?;

        self.repo
            .insert_message(&NewMessage {
                thread_id,
                sender_type,
                sender_id: sender_id.to_string(),
                content: content.to_string(),
            })
            .await
    }

    pub async fn list(&self, thread_id: ThreadId) -> AppResult<Vec<Message>> {
        self.repo.list_by_thread(thread_id).await
    }

    /// Idempotent: an already-seen message is returned as is
    pub async fn mark_seen(&self, message_id: MessageId) -> AppResult<Message> {
        self.repo
            .mark_seen(message_id)
            .await?
            .ok_or_else(|| AppError::not_found("Message not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, ThreadRepository};

    async fn store_with_thread() -> (MessageStore, ThreadId) {
        let storage = Arc::new(MemoryStorage::new());
        let thread = storage
            .insert_if_absent("cust1", "prov1")
            .await
            .unwrap()
            .unwrap();
        (MessageStore::new(storage, 20), thread.id)
    }

    #[tokio::test]
    async fn list_preserves_append_order() {
        let (store, thread_id) = store_with_thread().await;
        let sent: Vec<String> = (0..10).map(|i| format!("message {}", i)).collect();
        for (i, content) in sent.iter().enumerate() {
            let sender = if i % 2 == 0 {
                SenderType::Customer
            } else {
                SenderType::Provider
            };
            store.append(thread_id, sender, "someone", content).await.unwrap();
        }

        let listed: Vec<String> = store
            .list(thread_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(listed, sent);
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_persisting() {
        let (store, thread_id) = store_with_thread().await;
        let err = store
            .append(thread_id, SenderType::Customer, "cust1", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list(thread_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overlong_content_is_rejected() {
        let (store, thread_id) = store_with_thread().await;
        let content = "é".repeat(21);
        let err = store
            .append(thread_id, SenderType::Customer, "cust1", &content)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Limit counts characters, not bytes
        let content = "é".repeat(20);
        assert!(store
            .append(thread_id, SenderType::Customer, "cust1", &content)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent() {
        let (store, thread_id) = store_with_thread().await;
        let message = store
            .append(thread_id, SenderType::Customer, "cust1", "hello")
            .await
            .unwrap();
        assert!(!message.seen);

        let first = store.mark_seen(message.id).await.unwrap();
        let second = store.mark_seen(message.id).await.unwrap();
        assert!(first.seen);
        assert!(second.seen);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn mark_seen_unknown_message_is_not_found() {
        let (store, _) = store_with_thread().await;
        let err = store.mark_seen(12345).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
