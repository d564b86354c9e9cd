//! Common test utilities for leadscraper integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::json;

use leadscraper_service::{create_router, AppState, MemorySessionStore, ServiceConfig};
use leadscraper_store::MemoryStore;

/// Session secret used by every harness.
pub const SESSION_SECRET: &str = "test-session-secret";

/// Stripe webhook secret used when Stripe is enabled.
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
}

/// A registered user with a live session.
pub struct TestUser {
    /// User ID as returned by the API.
    pub id: String,
    /// `cookie` header value carrying the session.
    pub cookie: HeaderValue,
}

impl TestUser {
    /// The `cookie` header for authenticated requests.
    pub fn cookie_header(&self) -> (HeaderName, HeaderValue) {
        (header::COOKIE, self.cookie.clone())
    }
}

/// Configuration with no external services.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        session_secret: SESSION_SECRET.into(),
        ..ServiceConfig::default()
    }
}

/// Configuration with Stripe pointed at `base_url`.
pub fn stripe_config(base_url: &str, webhook_secret: Option<&str>) -> ServiceConfig {
    ServiceConfig {
        stripe_secret_key: Some("sk_test_123".into()),
        stripe_webhook_secret: webhook_secret.map(String::from),
        stripe_api_base: base_url.into(),
        ..test_config()
    }
}

/// Configuration with Mollie pointed at `base_url`.
pub fn mollie_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        mollie_api_key: Some("test_mollie_key".into()),
        mollie_api_base: base_url.into(),
        ..test_config()
    }
}

impl TestHarness {
    /// Create a new test harness with fresh in-memory backends.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemorySessionStore::new()),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        Self { server }
    }

    /// Register `username` and keep the session cookie.
    pub async fn register(&self, username: &str, password: &str) -> TestUser {
        let response = self
            .server
            .post("/api/register")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        Self::user_from(&response)
    }

    /// Log in and keep the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> TestUser {
        let response = self
            .server
            .post("/api/login")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status_ok();
        Self::user_from(&response)
    }

    /// Current balance of `user`.
    pub async fn credits(&self, user: &TestUser) -> i64 {
        let (name, value) = user.cookie_header();
        let response = self.server.get("/api/user").add_header(name, value).await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["credits"]
            .as_i64()
            .expect("credits should be a number")
    }

    /// Add credits to `user` through the API.
    pub async fn add_credits(&self, user: &TestUser, amount: i64) -> i64 {
        let (name, value) = user.cookie_header();
        let response = self
            .server
            .post("/api/credits/add")
            .add_header(name, value)
            .json(&json!({ "amount": amount }))
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["credits"]
            .as_i64()
            .expect("credits should be a number")
    }

    fn user_from(response: &TestResponse) -> TestUser {
        let body: serde_json::Value = response.json();
        TestUser {
            id: body["id"].as_str().expect("user id").to_string(),
            cookie: session_cookie(response).expect("session cookie"),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn the `Set-Cookie` of a response into a `cookie` request header.
pub fn session_cookie(response: &TestResponse) -> Option<HeaderValue> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("leadscraper.sid="))
        .and_then(|v| v.split(';').next())
        .and_then(|pair| HeaderValue::from_str(pair).ok())
}
