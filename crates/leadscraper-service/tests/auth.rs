//! Registration, login and session integration tests.

mod common;

use axum::http::{header, HeaderValue, StatusCode};
use common::{session_cookie, TestHarness};
use serde_json::json;

// ============================================================================
// Register
// ============================================================================

#[tokio::test]
async fn register_returns_user_without_password_hash() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/register")
        .json(&json!({ "username": "  Max@Example.DE ", "password": "pw" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "max@example.de");
    assert_eq!(body["credits"], 0);
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("leadscraper.sid="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let harness = TestHarness::new();
    harness.register("a@b.de", "pw").await;

    let response = harness
        .server
        .post("/api/register")
        .json(&json!({ "username": "A@B.de", "password": "other" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "Username already exists");
}

#[tokio::test]
async fn invalid_registration_input_is_rejected() {
    let harness = TestHarness::new();

    for body in [
        json!({ "username": "not-an-email", "password": "pw" }),
        json!({ "username": "a@b.de", "password": "" }),
        json!({ "username": "", "password": "pw" }),
    ] {
        harness
            .server
            .post("/api/register")
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Login / Logout
// ============================================================================

#[tokio::test]
async fn login_with_correct_password_starts_a_session() {
    let harness = TestHarness::new();
    let registered = harness.register("a@b.de", "pw").await;

    let user = harness.login("a@b.de", "pw").await;
    assert_eq!(user.id, registered.id);
    assert_ne!(user.cookie, registered.cookie);

    let (name, value) = user.cookie_header();
    let response = harness.server.get("/api/user").add_header(name, value).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], registered.id.as_str());
}

#[tokio::test]
async fn login_accepts_email_alias() {
    let harness = TestHarness::new();
    harness.register("a@b.de", "pw").await;

    let response = harness
        .server
        .post("/api/login")
        .json(&json!({ "email": "a@b.de", "password": "pw" }))
        .await;

    response.assert_status_ok();
    assert!(session_cookie(&response).is_some());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let harness = TestHarness::new();
    harness.register("a@b.de", "pw").await;

    for (username, password) in [("a@b.de", "wrong"), ("nobody@b.de", "pw")] {
        let response = harness
            .server
            .post("/api/login")
            .json(&json!({ "username": username, "password": password }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(session_cookie(&response).is_none());
    }
}

#[tokio::test]
async fn logout_ends_the_session() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;

    let (name, value) = user.cookie_header();
    let response = harness
        .server
        .post("/api/logout")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["ok"], true);

    harness
        .server
        .get("/api/user")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_replaces_the_previous_session() {
    let harness = TestHarness::new();
    let first = harness.register("a@b.de", "pw").await;

    let response = harness
        .server
        .post("/api/login")
        .add_header(header::COOKIE, first.cookie.clone())
        .json(&json!({ "username": "a@b.de", "password": "pw" }))
        .await;
    response.assert_status_ok();

    harness
        .server
        .get("/api/user")
        .add_header(header::COOKIE, first.cookie)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Session cookie checks
// ============================================================================

#[tokio::test]
async fn requests_without_a_valid_cookie_are_unauthorized() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;

    let raw = user.cookie.to_str().unwrap();
    let (unsigned, _) = raw.rsplit_once('.').unwrap();
    let forged = format!("{unsigned}.{}", "0".repeat(64));

    harness
        .server
        .get("/api/user")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    for cookie in [
        HeaderValue::from_static("leadscraper.sid=garbage"),
        HeaderValue::from_str(unsigned).unwrap(),
        HeaderValue::from_str(&forged).unwrap(),
    ] {
        let response = harness
            .server
            .get("/api/user")
            .add_header(header::COOKIE, cookie)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<serde_json::Value>()["error"]["code"],
            "unauthorized"
        );
    }
}

#[tokio::test]
async fn sessions_are_bound_to_the_signing_secret() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;

    let other = TestHarness::with_config(leadscraper_service::ServiceConfig {
        session_secret: "another-secret".into(),
        ..common::test_config()
    });

    other
        .server
        .get("/api/user")
        .add_header(header::COOKIE, user.cookie)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Business info
// ============================================================================

#[tokio::test]
async fn business_info_is_validated_and_stored() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    harness
        .server
        .post("/api/business-info")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "companyName": "  ",
            "contactName": "Max",
            "street": "Hauptstr. 1",
            "postalCode": "10115",
            "city": "Berlin",
            "country": "DE"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/api/business-info")
        .add_header(name, value)
        .json(&json!({
            "companyName": " Acme GmbH ",
            "contactName": "Max",
            "street": "Hauptstr. 1",
            "postalCode": "10115",
            "city": "Berlin",
            "country": "DE",
            "vatId": ""
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["businessInfo"]["companyName"], "Acme GmbH");
    assert!(body["businessInfo"]["vatId"].is_null());
    assert!(body["stripeCustomerId"].is_null());
}
