//! Credit balance integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn new_users_start_with_zero_credits() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;

    assert_eq!(harness.credits(&user).await, 0);
}

#[tokio::test]
async fn add_credits_returns_new_balance() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;

    assert_eq!(harness.add_credits(&user, 10).await, 10);
    assert_eq!(harness.add_credits(&user, 5).await, 15);
    assert_eq!(harness.add_credits(&user, -3).await, 12);
    assert_eq!(harness.credits(&user).await, 12);
}

#[tokio::test]
async fn add_credits_rejects_zero_and_overdraw() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    harness.add_credits(&user, 2).await;
    let (name, value) = user.cookie_header();

    harness
        .server
        .post("/api/credits/add")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "amount": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/api/credits/add")
        .add_header(name, value)
        .json(&json!({ "amount": -5 }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");

    assert_eq!(harness.credits(&user).await, 2);
}

#[tokio::test]
async fn add_credits_rejects_out_of_range_amounts() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    harness.add_credits(&user, 5).await;
    let (name, value) = user.cookie_header();

    for amount in [i64::MAX, i64::MIN, 1_000_001] {
        let response = harness
            .server
            .post("/api/credits/add")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "amount": amount }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    assert_eq!(harness.add_credits(&user, 1).await, 6);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    let response = harness
        .server
        .post("/api/credits/add")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "amount": "x" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");

    let response = harness
        .server
        .post("/api/credits/add")
        .add_header(name, value)
        .text("amount=5")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");

    assert_eq!(harness.credits(&user).await, 0);
}

#[tokio::test]
async fn add_credits_requires_a_session() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/api/credits/add")
        .json(&json!({ "amount": 10 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transactions_are_listed_newest_first() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    harness.add_credits(&user, 10).await;
    let (name, value) = user.cookie_header();

    harness
        .server
        .post("/api/scrape")
        .add_header(name.clone(), value.clone())
        .json(&json!({}))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/credits/transactions")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();

    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["kind"], "scrape");
    assert_eq!(transactions[0]["amount"], -1);
    assert_eq!(transactions[0]["balanceAfter"], 9);
    assert_eq!(transactions[1]["kind"], "manual");
    assert_eq!(transactions[1]["balanceAfter"], 10);
    assert_eq!(body["limit"], 50);

    let response = harness
        .server
        .get("/api/credits/transactions")
        .add_query_param("limit", 1)
        .add_query_param("offset", 1)
        .add_header(name, value)
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(body["transactions"][0]["kind"], "manual");
}

#[tokio::test]
async fn balances_are_per_user() {
    let harness = TestHarness::new();
    let alice = harness.register("alice@b.de", "pw").await;
    let bob = harness.register("bob@b.de", "pw").await;

    harness.add_credits(&alice, 7).await;

    assert_eq!(harness.credits(&alice).await, 7);
    assert_eq!(harness.credits(&bob).await, 0);
}
