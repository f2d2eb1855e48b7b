// ============================================================================
// Catalog Endpoint Tests
// ============================================================================
//
// - Provider listing and lookup
// - Review creation (201) and validation
// - Reviews by service, newest first
//
// ============================================================================

use serde_json::{json, Value};

use test_utils::spawn_app;

#[tokio::test]
async fn providers_are_listed_and_fetched() {
    let app = spawn_app().await;
    app.storage
        .add_provider("prov1", Some("Dana Plumbing"), Some("https://img/prov1.png"))
        .await;
    app.storage.add_provider("prov2", None, None).await;

    let providers: Vec<Value> = app
        .client
        .get(app.url("/api/providers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(providers.len(), 2);

    let response = app
        .client
        .get(app.url("/api/providers/prov1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let provider: Value = response.json().await.unwrap();
    assert_eq!(provider["fullName"], "Dana Plumbing");
    assert_eq!(provider["profileUrl"], "https://img/prov1.png");

    let response = app
        .client
        .get(app.url("/api/providers/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn review_is_created_with_201() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/reviews"))
        .json(&json!({
            "customerId": "cust1",
            "serviceId": "svc1",
            "rating": 5,
            "comment": "Fixed the leak in an hour",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let review: Value = response.json().await.unwrap();
    assert_eq!(review["rating"], 5);
    assert_eq!(review["serviceId"], "svc1");
    assert_eq!(review["comment"], "Fixed the leak in an hour");
}

#[tokio::test]
async fn invalid_reviews_are_rejected() {
    let app = spawn_app().await;

    let cases = [
        json!({ "serviceId": "svc1", "rating": 4 }),
        json!({ "customerId": "cust1", "rating": 4 }),
        json!({ "customerId": "cust1", "serviceId": "svc1" }),
        json!({ "customerId": "cust1", "serviceId": "svc1", "rating": 0 }),
        json!({ "customerId": "cust1", "serviceId": "svc1", "rating": 6 }),
        json!({ "customerId": "cust1", "serviceId": "svc1", "rating": "five" }),
    ];

    for body in cases {
        let response = app
            .client
            .post(app.url("/api/reviews"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "body: {}", body);
    }
}

#[tokio::test]
async fn reviews_are_listed_newest_first() {
    let app = spawn_app().await;

    for (rating, comment) in [(3, "ok"), (4, "good"), (5, "great")] {
        let response = app
            .client
            .post(app.url("/api/reviews"))
            .json(&json!({
                "customerId": "cust1",
                "serviceId": "svc1",
                "rating": rating,
                "comment": comment,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }
    app.client
        .post(app.url("/api/reviews"))
        .json(&json!({ "customerId": "cust1", "serviceId": "svc2", "rating": 1 }))
        .send()
        .await
        .unwrap();

    let reviews: Vec<Value> = app
        .client
        .get(app.url("/api/reviews/service/svc1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let comments: Vec<&str> = reviews
        .iter()
        .map(|r| r["comment"].as_str().unwrap())
        .collect();
    assert_eq!(comments, vec!["great", "good", "ok"]);
}
