// ============================================================================
// Message Dispatch Service
// ============================================================================
//
// The "send message" use case:
//
//   Validating -> Persisting -> Resolving -> Notifying -> Done
//
// Validation, persistence, and thread resolution failures end the request.
// Notifying is best effort: its errors are logged and dropped in `send`, and
// the persisted message is returned either way.
//
// ============================================================================

pub mod input;

use std::sync::Arc;

use crate::device_tokens::DeviceTokenDirectory;
use crate::error::AppResult;
use crate::messages::MessageStore;
use crate::metrics;
use crate::models::Message;
use crate::push::{PushDispatcher, PushMessage, PushOutcome};
use crate::recipient::{Recipient, RecipientResolver};
use crate::threads::ThreadRegistry;
use crate::utils::LogIds;

pub use input::{SendMessageCommand, SendMessageInput};

pub struct MessageDispatchService {
    threads: Arc<ThreadRegistry>,
    messages: Arc<MessageStore>,
    resolver: Arc<RecipientResolver>,
    directory: Arc<DeviceTokenDirectory>,
    dispatcher: Arc<PushDispatcher>,
    log_ids: LogIds,
}

impl MessageDispatchService {
    pub fn new(
        threads: Arc<ThreadRegistry>,
        messages: Arc<MessageStore>,
        resolver: Arc<RecipientResolver>,
        directory: Arc<DeviceTokenDirectory>,
        dispatcher: Arc<PushDispatcher>,
        log_ids: LogIds,
    ) -> Self {
        Self {
            threads,
            messages,
            resolver,
            directory,
            dispatcher,
            log_ids,
        }
    }

    pub async fn send(&self, input: SendMessageInput) -> AppResult<Message> {
        // Validating
        let command = input.validate()?;
        self.messages.validate_content(&command.content)?;

        // Persisting
        let message = self
            .messages
            .append(
                command.thread_id,
                command.sender_type,
                &command.sender_id,
                &command.content,
            )
            .await?;
        metrics::MESSAGES_SENT_TOTAL.inc();

        tracing::info!(
            message_id = message.id,
            thread_id = message.thread_id,
            sender_type = %message.sender_type,
            sender = %self.log_ids.user(&message.sender_id),
            "Message persisted"
        );

        // Resolving
        let thread = self.threads.get(message.thread_id).await?;
        let recipient = self
            .resolver
            .resolve(&thread, message.sender_type, &message.sender_id)
            .await;

        // Notifying
        match self.notify(&message, &recipient).await {
            Ok(Some(outcome)) => {
                tracing::debug!(
                    message_id = message.id,
                    outcome = outcome.kind(),
                    "Notify step finished"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    message_id = message.id,
                    recipient = %self.log_ids.user(&recipient.user_id),
                    error = %e,
                    "Notify step failed, message already persisted"
                );
            }
        }

        // Done
        Ok(message)
    }

    /// Look up the recipient's token and push to it. `None` when there is
    /// nothing to send to.
    async fn notify(
        &self,
        message: &Message,
        recipient: &Recipient,
    ) -> AppResult<Option<PushOutcome>> {
        if !self.dispatcher.is_enabled() {
            return Ok(None);
        }

        // Single-device delivery: only the first token on file is used
        let tokens = self.directory.lookup(&recipient.user_id).await?;
        let Some(token) = tokens.first() else {
            tracing::debug!(
                message_id = message.id,
                recipient = %self.log_ids.user(&recipient.user_id),
                "No device token on file, skipping push"
            );
            return Ok(None);
        };

        let push = PushMessage::for_new_message(token, message, recipient);
        Ok(Some(self.dispatcher.send(&push).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use crate::error::AppError;
    use crate::models::{DeviceToken, SenderType};
    use crate::push::PushTransport;
    use crate::storage::{DeviceTokenRepository, MemoryStorage, MessageRepository, ThreadRepository};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        outcome: PushOutcome,
        sent: Mutex<Vec<PushMessage>>,
    }

    #[async_trait]
    impl PushTransport for Scripted {
        async fn send(&self, message: &PushMessage) -> PushOutcome {
            self.sent.lock().unwrap().push(message.clone());
            self.outcome.clone()
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct BrokenTokens;

    #[async_trait]
    impl DeviceTokenRepository for BrokenTokens {
        async fn tokens_for_user(&self, _: &str) -> AppResult<Vec<DeviceToken>> {
            Err(AppError::store("device_tokens unavailable"))
        }

        async fn upsert_for_user(&self, _: &str, _: &str) -> AppResult<DeviceToken> {
            Err(AppError::store("device_tokens unavailable"))
        }

        async fn delete_token(&self, _: &str) -> AppResult<u64> {
            Err(AppError::store("device_tokens unavailable"))
        }
    }

    struct Harness {
        storage: Arc<MemoryStorage>,
        transport: Arc<Scripted>,
        service: MessageDispatchService,
        directory: Arc<DeviceTokenDirectory>,
    }

    fn harness_with(
        outcome: PushOutcome,
        tokens: Option<Arc<dyn DeviceTokenRepository>>,
    ) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let log_ids = LogIds::new(&LoggingConfig::default());
        let transport = Arc::new(Scripted {
            outcome,
            sent: Mutex::new(Vec::new()),
        });
        let token_repo: Arc<dyn DeviceTokenRepository> = match tokens {
            Some(repo) => repo,
            None => storage.clone(),
        };
        let directory = Arc::new(DeviceTokenDirectory::new(token_repo, log_ids.clone()));
        let dispatcher = Arc::new(PushDispatcher::new(
            transport.clone(),
            directory.clone(),
            Duration::from_secs(1),
        ));
        let service = MessageDispatchService::new(
            Arc::new(ThreadRegistry::new(storage.clone(), log_ids.clone())),
            Arc::new(MessageStore::new(storage.clone(), 4000)),
            Arc::new(RecipientResolver::new(storage.clone(), Duration::from_secs(1))),
            directory.clone(),
            dispatcher,
            log_ids,
        );
        Harness {
            storage,
            transport,
            service,
            directory,
        }
    }

    fn harness(outcome: PushOutcome) -> Harness {
        harness_with(outcome, None)
    }

    fn send_input(thread_id: i64, content: Option<&str>) -> SendMessageInput {
        SendMessageInput {
            thread_id: Some(json!(thread_id)),
            sender_type: Some("Provider".to_string()),
            sender_id: Some("prov1".to_string()),
            content: content.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn stale_token_still_returns_message_and_prunes() {
        let h = harness(PushOutcome::StaleRegistration);
        let thread = h.storage.insert_if_absent("cust1", "prov1").await.unwrap().unwrap();
        h.directory.upsert("cust1", "fcm-token").await.unwrap();

        let message = h.service.send(send_input(thread.id, Some("Hi there"))).await.unwrap();

        assert_eq!(message.content, "Hi there");
        assert_eq!(message.sender_type, SenderType::Provider);
        assert!(!message.seen);
        assert!(h.directory.lookup("cust1").await.unwrap().is_empty());

        let sent = h.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "fcm-token");
        assert_eq!(sent[0].data["threadId"], thread.id.to_string());
    }

    #[tokio::test]
    async fn zero_tokens_skips_push() {
        let h = harness(PushOutcome::Delivered { id: "x".to_string() });
        let thread = h.storage.insert_if_absent("cust1", "prov1").await.unwrap().unwrap();

        let message = h.service.send(send_input(thread.id, Some("Hi there"))).await.unwrap();

        assert_eq!(message.thread_id, thread.id);
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_content_persists_nothing() {
        let h = harness(PushOutcome::Delivered { id: "x".to_string() });
        let thread = h.storage.insert_if_absent("cust1", "prov1").await.unwrap().unwrap();

        let err = h.service.send(send_input(thread.id, None)).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.storage.list_by_thread(thread.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found_and_not_persisted() {
        let h = harness(PushOutcome::Delivered { id: "x".to_string() });

        let err = h.service.send(send_input(99, Some("Hi there"))).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.storage.list_by_thread(99).await.unwrap().is_empty());
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn notify_errors_do_not_fail_the_send() {
        let h = harness_with(
            PushOutcome::Delivered { id: "x".to_string() },
            Some(Arc::new(BrokenTokens)),
        );
        let thread = h.storage.insert_if_absent("cust1", "prov1").await.unwrap().unwrap();

        let message = h.service.send(send_input(thread.id, Some("Hi there"))).await.unwrap();

        assert_eq!(message.content, "Hi there");
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn customer_message_notifies_provider() {
        let h = harness(PushOutcome::Delivered { id: "x".to_string() });
        h.storage.add_customer("cust1", Some("Alex")).await;
        let thread = h.storage.insert_if_absent("cust1", "prov1").await.unwrap().unwrap();
        h.directory.upsert("prov1", "prov-device").await.unwrap();

        let input = SendMessageInput {
            thread_id: Some(json!(thread.id)),
            sender_type: Some("Customer".to_string()),
            sender_id: Some("cust1".to_string()),
            content: Some("Is Tuesday ok?".to_string()),
        };
        h.service.send(input).await.unwrap();

        let sent = h.transport.sent.lock().unwrap();
        assert_eq!(sent[0].token, "prov-device");
        assert_eq!(sent[0].title, "New message from Alex");
        assert_eq!(sent[0].data["profileUrl"], "");
    }
}
