//! Payment intent integration tests.

mod common;

use axum::http::StatusCode;
use common::{mollie_config, stripe_config, TestHarness, STRIPE_WEBHOOK_SECRET};
use leadscraper_service::ServiceConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn stripe_intent_carries_user_and_credit_metadata() {
    let stripe = MockServer::start().await;
    let harness =
        TestHarness::with_config(stripe_config(&stripe.uri(), Some(STRIPE_WEBHOOK_SECRET)));
    let user = harness.register("a@b.de", "pw").await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .and(body_string_contains("amount=2500"))
        .and(body_string_contains("currency=eur"))
        .and(body_string_contains("metadata%5BcreditAmount%5D=25"))
        .and(body_string_contains(format!("metadata%5BuserId%5D={}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "amount": 2500,
            "currency": "eur",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let (name, value) = user.cookie_header();
    let response = harness
        .server
        .post("/api/create-payment-intent")
        .add_header(name, value)
        .json(&json!({ "creditAmount": 25 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["provider"], "stripe");
    assert_eq!(body["paymentId"], "pi_123");
    assert_eq!(body["clientSecret"], "pi_123_secret_abc");
    assert_eq!(body["amount"], 2500);
    assert_eq!(body["creditAmount"], 25);

    // Nothing is credited before the webhook arrives.
    assert_eq!(harness.credits(&user).await, 0);
}

#[tokio::test]
async fn mollie_payment_returns_checkout_url() {
    let mollie = MockServer::start().await;
    let harness = TestHarness::with_config(ServiceConfig {
        custom_domain: Some("leads.example.com".into()),
        ..mollie_config(&mollie.uri())
    });
    let user = harness.register("a@b.de", "pw").await;

    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(body_partial_json(json!({
            "amount": { "currency": "EUR", "value": "3.00" },
            "redirectUrl": "https://leads.example.com/dashboard?payment=complete",
            "webhookUrl": "https://leads.example.com/api/mollie-webhook",
            "metadata": { "userId": user.id, "creditAmount": 3 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resource": "payment",
            "id": "tr_abc",
            "status": "open",
            "amount": { "currency": "EUR", "value": "3.00" },
            "_links": {
                "checkout": { "href": "https://www.mollie.com/checkout/tr_abc", "type": "text/html" }
            }
        })))
        .expect(1)
        .mount(&mollie)
        .await;

    let (name, value) = user.cookie_header();
    let response = harness
        .server
        .post("/api/create-payment-intent")
        .add_header(name, value)
        .json(&json!({ "creditAmount": 3, "provider": "mollie" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["provider"], "mollie");
    assert_eq!(body["paymentId"], "tr_abc");
    assert_eq!(body["checkoutUrl"], "https://www.mollie.com/checkout/tr_abc");
    assert!(body.get("clientSecret").is_none());
}

#[tokio::test]
async fn credit_amount_must_be_in_range() {
    let stripe = MockServer::start().await;
    let harness =
        TestHarness::with_config(stripe_config(&stripe.uri(), Some(STRIPE_WEBHOOK_SECRET)));
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    for amount in [0, -1, 10_001] {
        harness
            .server
            .post("/api/create-payment-intent")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "creditAmount": amount }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn unconfigured_provider_is_unavailable() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    harness
        .server
        .post("/api/create-payment-intent")
        .add_header(name, value)
        .json(&json!({ "creditAmount": 10 }))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn provider_failure_is_an_internal_error() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "type": "card_error", "message": "Your card was declined." }
        })))
        .mount(&stripe)
        .await;
    let harness =
        TestHarness::with_config(stripe_config(&stripe.uri(), Some(STRIPE_WEBHOOK_SECRET)));
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    let response = harness
        .server
        .post("/api/create-payment-intent")
        .add_header(name, value)
        .json(&json!({ "creditAmount": 10 }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "An internal error occurred");
}

#[tokio::test]
async fn business_info_creates_stripe_customer() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(body_string_contains("email=a%40b.de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_123",
            "email": "a@b.de"
        })))
        .expect(1)
        .mount(&stripe)
        .await;
    let harness =
        TestHarness::with_config(stripe_config(&stripe.uri(), Some(STRIPE_WEBHOOK_SECRET)));
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    let info = json!({
        "companyName": "Acme GmbH",
        "contactName": "Max",
        "street": "Hauptstr. 1",
        "postalCode": "10115",
        "city": "Berlin",
        "country": "DE"
    });

    for _ in 0..2 {
        let response = harness
            .server
            .post("/api/business-info")
            .add_header(name.clone(), value.clone())
            .json(&info)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["stripeCustomerId"], "cus_123");
    }
}
