use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    DeviceTokenRepository, MessageRepository, ProfileRepository, ReviewRepository, StorageHealth,
    ThreadRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Customer, DeviceToken, Message, MessageId, NewMessage, NewReview, Provider, Review, Thread,
    ThreadId,
};

#[derive(Default)]
struct MemoryState {
    threads: BTreeMap<ThreadId, Thread>,
    thread_pairs: HashMap<(String, String), ThreadId>,
    messages: BTreeMap<MessageId, Message>,
    /// Keyed by user id
    device_tokens: HashMap<String, DeviceToken>,
    providers: BTreeMap<String, Provider>,
    customers: HashMap<String, Customer>,
    reviews: Vec<Review>,
    next_thread_id: ThreadId,
    next_message_id: MessageId,
    next_review_id: i64,
    last_message_at: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Creation timestamps never go backwards, even if the wall clock does
    fn message_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_message_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_message_at = Some(ts);
        ts
    }
}

/// Process-local store with the same contracts as the Postgres schema.
///
/// All writes happen under one lock, so conditional inserts are atomic.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a store error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::store("storage backend unavailable"));
        }
        Ok(())
    }

    pub async fn add_provider(
        &self,
        id: &str,
        full_name: Option<&str>,
        profile_url: Option<&str>,
    ) -> Provider {
        let provider = Provider {
            id: id.to_string(),
            full_name: full_name.map(str::to_string),
            profile_url: profile_url.map(str::to_string),
            email: None,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .providers
            .insert(provider.id.clone(), provider.clone());
        provider
    }

    pub async fn add_customer(&self, id: &str, full_name: Option<&str>) -> Customer {
        let customer = Customer {
            id: id.to_string(),
            full_name: full_name.map(str::to_string),
        };
        self.state
            .write()
            .await
            .customers
            .insert(customer.id.clone(), customer.clone());
        customer
    }

    pub async fn thread_count(&self) -> usize {
        self.state.read().await.threads.len()
    }
}

#[async_trait]
impl ThreadRepository for MemoryStorage {
    async fn find_by_pair(
        &self,
        customer_id: &str,
        provider_id: &str,
    ) -> AppResult<Option<Thread>> {
        self.check_available()?;
        let state = self.state.read().await;
        let key = (customer_id.to_string(), provider_id.to_string());
        Ok(state
            .thread_pairs
            .get(&key)
            .and_then(|id| state.threads.get(id))
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        customer_id: &str,
        provider_id: &str,
    ) -> AppResult<Option<Thread>> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let key = (customer_id.to_string(), provider_id.to_string());
        if state.thread_pairs.contains_key(&key) {
            return Ok(None);
        }

        state.next_thread_id += 1;
        let thread = Thread {
            id: state.next_thread_id,
            customer_id: customer_id.to_string(),
            provider_id: provider_id.to_string(),
            created_at: Utc::now(),
        };
        state.thread_pairs.insert(key, thread.id);
        state.threads.insert(thread.id, thread.clone());

        Ok(Some(thread))
    }

    async fn find_by_id(&self, thread_id: ThreadId) -> AppResult<Option<Thread>> {
        self.check_available()?;
        Ok(self.state.read().await.threads.get(&thread_id).cloned())
    }
}

#[async_trait]
impl MessageRepository for MemoryStorage {
    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if !state.threads.contains_key(&message.thread_id) {
            return Err(AppError::not_found("Thread not found"));
        }

        state.next_message_id += 1;
        let created_at = state.message_timestamp();
        let stored = Message {
            id: state.next_message_id,
            thread_id: message.thread_id,
            sender_type: message.sender_type,
            sender_id: message.sender_id.clone(),
            content: message.content.clone(),
            seen: false,
            created_at,
        };
        state.messages.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn list_by_thread(&self, thread_id: ThreadId) -> AppResult<Vec<Message>> {
        self.check_available()?;
        let state = self.state.read().await;
        // BTreeMap iteration is id order, which is append order
        Ok(state
            .messages
            .values()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn mark_seen(&self, message_id: MessageId) -> AppResult<Option<Message>> {
        self.check_available()?;
        let mut state = self.state.write().await;
        Ok(state.messages.get_mut(&message_id).map(|message| {
            message.seen = true;
            message.clone()
        }))
    }
}

#[async_trait]
impl DeviceTokenRepository for MemoryStorage {
    async fn tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.device_tokens.get(user_id).cloned().into_iter().collect())
    }

    async fn upsert_for_user(&self, user_id: &str, token: &str) -> AppResult<DeviceToken> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state
            .device_tokens
            .retain(|owner, existing| owner == user_id || existing.token != token);

        let record = DeviceToken {
            user_id: user_id.to_string(),
            token: token.to_string(),
            updated_at: Utc::now(),
        };
        state
            .device_tokens
            .insert(user_id.to_string(), record.clone());

        Ok(record)
    }

    async fn delete_token(&self, token: &str) -> AppResult<u64> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let before = state.device_tokens.len();
        state.device_tokens.retain(|_, existing| existing.token != token);
        Ok((before - state.device_tokens.len()) as u64)
    }
}

#[async_trait]
impl ProfileRepository for MemoryStorage {
    async fn provider(&self, provider_id: &str) -> AppResult<Option<Provider>> {
        self.check_available()?;
        Ok(self.state.read().await.providers.get(provider_id).cloned())
    }

    async fn list_providers(&self) -> AppResult<Vec<Provider>> {
        self.check_available()?;
        let mut providers: Vec<Provider> =
            self.state.read().await.providers.values().cloned().collect();
        providers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(providers)
    }

    async fn customer(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        self.check_available()?;
        Ok(self.state.read().await.customers.get(customer_id).cloned())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStorage {
    async fn insert_review(&self, review: &NewReview) -> AppResult<Review> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.next_review_id += 1;
        let stored = Review {
            id: state.next_review_id,
            customer_id: review.customer_id.clone(),
            service_id: review.service_id.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        state.reviews.push(stored.clone());
        Ok(stored)
    }

    async fn list_by_service(&self, service_id: &str) -> AppResult<Vec<Review>> {
        self.check_available()?;
        let mut reviews: Vec<Review> = self
            .state
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| r.service_id == service_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(reviews)
    }
}

#[async_trait]
impl StorageHealth for MemoryStorage {
    async fn ping(&self) -> AppResult<()> {
        self.check_available()
    }
}
