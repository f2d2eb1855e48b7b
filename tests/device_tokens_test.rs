// ============================================================================
// Device Token Endpoint Tests
// ============================================================================

use serde_json::{json, Value};

use test_utils::spawn_app;

#[tokio::test]
async fn register_returns_the_stored_record() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/device-tokens/register"))
        .json(&json!({ "userId": "cust1", "token": "abc123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["token"]["userId"], "cust1");
    assert_eq!(body["token"]["token"], "abc123");
}

#[tokio::test]
async fn register_requires_user_and_token() {
    let app = spawn_app().await;

    for body in [json!({ "userId": "cust1" }), json!({ "token": "abc123" })] {
        let response = app
            .client
            .post(app.url("/api/device-tokens/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }
}

#[tokio::test]
async fn token_with_whitespace_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/device-tokens/register"))
        .json(&json!({ "userId": "cust1", "token": "abc 123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn remove_is_idempotent() {
    let app = spawn_app().await;

    app.client
        .post(app.url("/api/device-tokens/register"))
        .json(&json!({ "userId": "cust1", "token": "abc123" }))
        .send()
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app
            .client
            .post(app.url("/api/device-tokens/remove"))
            .json(&json!({ "token": "abc123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "success": true }));
    }
}

#[tokio::test]
async fn refresh_token_accepts_legacy_and_camel_case_fields() {
    let app = spawn_app().await;

    for body in [
        json!({ "UserID": "prov1", "Token": "legacy-token" }),
        json!({ "userId": "prov1", "token": "camel-token" }),
    ] {
        let response = app
            .client
            .post(app.url("/api/notifications/refresh-token"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().is_empty());
    }

    // The second registration replaced the first for the same user
    let thread: Value = app
        .client
        .post(app.url("/api/messages/thread"))
        .json(&json!({ "customerId": "cust1", "providerId": "prov1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    app.client
        .post(app.url("/api/messages/send"))
        .json(&json!({
            "threadId": thread["id"],
            "senderType": "Customer",
            "senderId": "cust1",
            "content": "hello",
        }))
        .send()
        .await
        .unwrap();

    let sent = app.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "camel-token");
}

#[tokio::test]
async fn refresh_token_requires_fields() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/notifications/refresh-token"))
        .json(&json!({ "UserID": "prov1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Token is required");
}
