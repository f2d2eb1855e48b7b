// ============================================================================
// Postgres Storage Tests
// ============================================================================
//
// The same behaviour the in-memory tests cover, against a real database:
// - Concurrent first calls for a pair share one thread
// - Sending to a missing thread is a 404 and persists nothing
// - Messages list oldest first
// - A token moves to the last user who registered it, even under races
//
// Each test creates its own database, see `configure_database`.
//
// ============================================================================

use serde_json::{json, Value};
use std::sync::Arc;
use threadline_server::{
    config::LoggingConfig, device_tokens::DeviceTokenDirectory, storage::PostgresStorage,
    threads::ThreadRegistry, utils::LogIds,
};
use tokio::task::JoinSet;

use test_utils::{configure_database, spawn_pg_app, PgTestApp};

async fn pg_storage() -> (sqlx::PgPool, Arc<PostgresStorage>) {
    let pool = configure_database().await;
    let storage = Arc::new(PostgresStorage::new(pool.clone()));
    (pool, storage)
}

fn log_ids() -> LogIds {
    LogIds::new(&LoggingConfig::default())
}

async fn create_thread(app: &PgTestApp, customer_id: &str, provider_id: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/messages/thread"))
        .json(&json!({ "customerId": customer_id, "providerId": provider_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
#[ignore] // Requires Postgres - run with: cargo test --test postgres_storage_test -- --ignored
async fn concurrent_first_calls_share_one_thread() {
    let (pool, storage) = pg_storage().await;
    let registry = Arc::new(ThreadRegistry::new(storage, log_ids()));

    let mut callers = JoinSet::new();
    for _ in 0..32 {
        let registry = registry.clone();
        callers.spawn(async move { registry.get_or_create("cust1", "prov1").await });
    }

    let mut ids = Vec::new();
    while let Some(joined) = callers.join_next().await {
        ids.push(joined.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message_threads")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore] // Requires Postgres - run with: cargo test --test postgres_storage_test -- --ignored
async fn send_to_missing_thread_is_not_found() {
    let app = spawn_pg_app().await;

    let response = app
        .client
        .post(app.url("/api/messages/send"))
        .json(&json!({
            "threadId": 424242,
            "senderType": "Customer",
            "senderId": "cust1",
            "content": "hello?",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Thread not found");
    assert_eq!(body["error_code"], "NOT_FOUND");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
#[ignore] // Requires Postgres - run with: cargo test --test postgres_storage_test -- --ignored
async fn messages_are_listed_oldest_first() {
    let app = spawn_pg_app().await;
    let thread = create_thread(&app, "cust1", "prov1").await;
    let again = create_thread(&app, "cust1", "prov1").await;
    assert_eq!(thread["id"], again["id"]);

    let expected = ["one", "two", "three", "four", "five"];
    for (i, content) in expected.iter().enumerate() {
        let (sender_type, sender_id) = if i % 2 == 0 {
            ("Customer", "cust1")
        } else {
            ("Provider", "prov1")
        };
        let response = app
            .client
            .post(app.url("/api/messages/send"))
            .json(&json!({
                "threadId": thread["id"],
                "senderType": sender_type,
                "senderId": sender_id,
                "content": content,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let listed: Vec<Value> = app
        .client
        .get(app.url(&format!("/api/messages/thread/{}", thread["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let contents: Vec<&str> = listed
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
#[ignore] // Requires Postgres - run with: cargo test --test postgres_storage_test -- --ignored
async fn token_moves_to_the_last_user_who_registered_it() {
    let (_pool, storage) = pg_storage().await;
    let directory = DeviceTokenDirectory::new(storage, log_ids());

    directory.upsert("cust1", "shared-device").await.unwrap();
    directory.upsert("prov1", "shared-device").await.unwrap();

    assert!(directory.lookup("cust1").await.unwrap().is_empty());
    assert_eq!(
        directory.lookup("prov1").await.unwrap(),
        vec!["shared-device".to_string()]
    );

    // Re-registering a user replaces their previous token
    directory.upsert("prov1", "new-device").await.unwrap();
    assert_eq!(
        directory.lookup("prov1").await.unwrap(),
        vec!["new-device".to_string()]
    );
}

#[tokio::test]
#[ignore] // Requires Postgres - run with: cargo test --test postgres_storage_test -- --ignored
async fn racing_registrations_of_one_token_never_fail() {
    let (pool, storage) = pg_storage().await;
    let directory = DeviceTokenDirectory::new(storage, log_ids());

    for round in 0..50 {
        let token = format!("contested-device-{}", round);
        let (first, second) = tokio::join!(
            directory.upsert("cust1", &token),
            directory.upsert("prov1", &token)
        );
        first.unwrap();
        second.unwrap();

        let owners: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM device_tokens WHERE token = $1")
                .bind(&token)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(owners.len(), 1, "round {}", round);
    }
}
