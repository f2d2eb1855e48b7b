use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    DeviceTokenRepository, MessageRepository, ProfileRepository, ReviewRepository, StorageHealth,
    ThreadRepository,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    Customer, DeviceToken, Message, MessageId, NewMessage, NewReview, Provider, Review,
    SenderType, Thread, ThreadId,
};

/// PostgreSQL implementation of every repository
pub struct PostgresStorage {
    pool: DbPool,
}

impl PostgresStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    customer_id: String,
    provider_id: String,
    created_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: row.id,
            customer_id: row.customer_id,
            provider_id: row.provider_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    thread_id: i64,
    sender_type: String,
    sender_id: String,
    content: String,
    seen: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Self> {
        let sender_type = row.sender_type.parse::<SenderType>().map_err(|e| {
            AppError::store(format!("message {} has invalid sender_type: {}", row.id, e))
        })?;

        Ok(Message {
            id: row.id,
            thread_id: row.thread_id,
            sender_type,
            sender_id: row.sender_id,
            content: row.content,
            seen: row.seen,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeviceTokenRow {
    user_id: String,
    token: String,
    updated_at: DateTime<Utc>,
}

impl From<DeviceTokenRow> for DeviceToken {
    fn from(row: DeviceTokenRow) -> Self {
        DeviceToken {
            user_id: row.user_id,
            token: row.token,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProviderRow {
    id: String,
    full_name: Option<String>,
    profile_url: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Provider {
            id: row.id,
            full_name: row.full_name,
            profile_url: row.profile_url,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    customer_id: String,
    service_id: String,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            customer_id: row.customer_id,
            service_id: row.service_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ThreadRepository for PostgresStorage {
    async fn find_by_pair(
        &self,
        customer_id: &str,
        provider_id: &str,
    ) -> AppResult<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadRow>(
            r#"
            SELECT id, customer_id, provider_id, created_at
            FROM message_threads
            WHERE customer_id = $1 AND provider_id = $2
            "#,
        )
        .bind(customer_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Thread::from))
    }

    async fn insert_if_absent(
        &self,
        customer_id: &str,
        provider_id: &str,
    ) -> AppResult<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadRow>(
            r#"
            INSERT INTO message_threads (customer_id, provider_id)
            VALUES ($1, $2)
            ON CONFLICT (customer_id, provider_id) DO NOTHING
            RETURNING id, customer_id, provider_id, created_at
            "#,
        )
        .bind(customer_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Thread::from))
    }

    async fn find_by_id(&self, thread_id: ThreadId) -> AppResult<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadRow>(
            r#"
            SELECT id, customer_id, provider_id, created_at
            FROM message_threads
            WHERE id = $1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Thread::from))
    }
}

#[async_trait]
impl MessageRepository for PostgresStorage {
    async fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (thread_id, sender_type, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, thread_id, sender_type, sender_id, content, seen, created_at
            "#,
        )
        .bind(message.thread_id)
        .bind(message.sender_type.as_str())
        .bind(&message.sender_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found("Thread not found")
            }
            _ => AppError::Database(e),
        })?;

        Message::try_from(row)
    }

    async fn list_by_thread(&self, thread_id: ThreadId) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, thread_id, sender_type, sender_id, content, seen, created_at
            FROM messages
            WHERE thread_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn mark_seen(&self, message_id: MessageId) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE messages
            SET seen = TRUE
            WHERE id = $1
            RETURNING id, thread_id, sender_type, sender_id, content, seen, created_at
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }
}

#[async_trait]
impl DeviceTokenRepository for PostgresStorage {
    async fn tokens_for_user(&self, user_id: &str) -> AppResult<Vec<DeviceToken>> {
        let rows = sqlx::query_as::<_, DeviceTokenRow>(
            r#"
            SELECT user_id, token, updated_at
            FROM device_tokens
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DeviceToken::from).collect())
    }

    async fn upsert_for_user(&self, user_id: &str, token: &str) -> AppResult<DeviceToken> {
        let mut tx = self.pool.begin().await?;

        // Serialize registrations of the same token so the evicting DELETE
        // and the INSERT below can't interleave with another user's pair
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('device_tokens'), hashtext($1))")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        // A device belongs to the last user who registered it
        sqlx::query(
            r#"
            DELETE FROM device_tokens
            WHERE token = $1 AND user_id <> $2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, DeviceTokenRow>(
            r#"
            INSERT INTO device_tokens (user_id, token, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                token = EXCLUDED.token,
                updated_at = NOW()
            RETURNING user_id, token, updated_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn delete_token(&self, token: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM device_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProfileRepository for PostgresStorage {
    async fn provider(&self, provider_id: &str) -> AppResult<Option<Provider>> {
        let row = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT id, full_name, profile_url, email, created_at
            FROM providers
            WHERE id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Provider::from))
    }

    async fn list_providers(&self) -> AppResult<Vec<Provider>> {
        let rows = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT id, full_name, profile_url, email, created_at
            FROM providers
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Provider::from).collect())
    }

    async fn customer(&self, customer_id: &str) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT id, full_name
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, full_name)| Customer { id, full_name }))
    }
}

#[async_trait]
impl ReviewRepository for PostgresStorage {
    async fn insert_review(&self, review: &NewReview) -> AppResult<Review> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (customer_id, service_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, customer_id, service_id, rating, comment, created_at
            "#,
        )
        .bind(&review.customer_id)
        .bind(&review.service_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_by_service(&self, service_id: &str) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, customer_id, service_id, rating, comment, created_at
            FROM reviews
            WHERE service_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }
}

#[async_trait]
impl StorageHealth for PostgresStorage {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
