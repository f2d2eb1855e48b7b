// ============================================================================
// Thread Registry
// ============================================================================
//
// Owns the (customer, provider) -> Thread mapping. Creation goes through the
// store's atomic insert-if-absent; losing the insert race means another
// request created the thread first, so we read theirs.
//
// ============================================================================

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{Thread, ThreadId};
use crate::storage::ThreadRepository;
use crate::utils::LogIds;

pub struct ThreadRegistry {
    repo: Arc<dyn ThreadRepository>,
    log_ids: LogIds,
}

impl ThreadRegistry {
    pub fn new(repo: Arc<dyn ThreadRepository>, log_ids: LogIds) -> Self {
        Self { repo, log_ids }
    }

    pub async fn get_or_create(&self, customer_id: &str, provider_id: &str) -> AppResult<Thread> {
        if customer_id.trim().is_empty() {
            return Err(AppError::validation("customerId is required"));
        }
        if provider_id.trim().is_empty() {
            return Err(AppError::validation("providerId is required"));
        }

        if let Some(thread) = self.repo.find_by_pair(customer_id, provider_id).await? {
            return Ok(thread);
        }

        match self.repo.insert_if_absent(customer_id, provider_id).await? {
            Some(thread) => {
                metrics::THREADS_CREATED_TOTAL.inc();
                tracing::info!(
                    thread_id = thread.id,
                    customer = %self.log_ids.user(customer_id),
                    provider = %self.log_ids.user(provider_id),
                    "Thread created"
                );
                Ok(thread)
            }
            None => {
                tracing::debug!(
                    customer = %self.log_ids.user(customer_id),
                    provider = %self.log_ids.user(provider_id),
                    "Concurrent thread creation, re-reading existing thread"
                );
                self.repo
                    .find_by_pair(customer_id, provider_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal("thread insert conflicted but no thread was found")
                    })
            }
        }
    }

    pub async fn get(&self, thread_id: ThreadId) -> AppResult<Thread> {
        self.repo
            .find_by_id(thread_id)
            .await?
            .ok_or_else(|| AppError::not_found("Thread not found"))
    }
}
