// ============================================================================
// Storage
// ============================================================================
//
// Repository traits for the row store behind the messaging core, plus the
// two implementations:
// - postgres: sqlx-backed production store
// - memory: process-local store for development and tests
//
// Every trait method is a single equality/ordering query or an upsert; the
// components above decide what the rows mean.
//
// ============================================================================

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    Customer, DeviceToken, Message, MessageId, NewMessage, NewReview, Provider, Review, Thread,
    ThreadId,
};

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Exact match on the stored (customer, provider) pair
    async fn find_by_pair(&self, customer_id: &str, provider_id: &str)
        -> AppResult<Option<Thread>>;

    /// Atomically insert the pair unless it already exists.
    ///
    /// Returns `None` when another writer already owns the pair; the caller
    /// re-reads with `find_by_pair`.
    async fn insert_if_absent(
        &self,
        customer_id: &str,
        provider_id: &str,
    ) -> AppResult<Option<Thread>>;

    async fn find_by_id(&self, thread_id: ThreadId) -> AppResult<Option<Thread>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message. Fails with `NotFound` if the thread does not exist.
    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message>;

    /// Messages of a thread, ascending by creation time
    async fn list_by_thread(&self, thread_id: ThreadId) -> AppResult<Vec<Message>>;

    /// Set `seen = true`; `None` if the message does not exist
    async fn mark_seen(&self, message_id: MessageId) -> AppResult<Option<Message>>;
}

#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    /// Tokens on file for a user, most recently refreshed first
    async fn tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>>;

    /// Store `token` as the user's registration, replacing any previous token
    /// and evicting the same token from any other user.
    async fn upsert_for_user(&self, user_id: &str, token: &str) -> AppResult<DeviceToken>;

    /// Delete every registration holding `token`; returns rows removed
    async fn delete_token(&self, token: &str) -> AppResult<u64>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn provider(&self, provider_id: &str) -> AppResult<Option<Provider>>;

    async fn list_providers(&self) -> AppResult<Vec<Provider>>;

    async fn customer(&self, customer_id: &str) -> AppResult<Option<Customer>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert_review(&self, review: &NewReview) -> AppResult<Review>;

    /// Reviews of a service, newest first
    async fn list_by_service(&self, service_id: &str) -> AppResult<Vec<Review>>;
}

#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// The set of repositories the service is wired with
#[derive(Clone)]
pub struct Repositories {
    pub threads: Arc<dyn ThreadRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub device_tokens: Arc<dyn DeviceTokenRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub health: Arc<dyn StorageHealth>,
}

impl Repositories {
    pub fn postgres(storage: Arc<PostgresStorage>) -> Self {
        Self {
            threads: storage.clone(),
            messages: storage.clone(),
            device_tokens: storage.clone(),
            profiles: storage.clone(),
            reviews: storage.clone(),
            health: storage,
        }
    }

    pub fn memory(storage: Arc<MemoryStorage>) -> Self {
        Self {
            threads: storage.clone(),
            messages: storage.clone(),
            device_tokens: storage.clone(),
            profiles: storage.clone(),
            reviews: storage.clone(),
            health: storage,
        }
    }
}
