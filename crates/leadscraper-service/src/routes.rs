//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, blog, business, credits, health, leads, payments, webhooks};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /api/blog-posts`, `GET /api/blog-posts/:id` - Blog
///
/// ## Auth
/// - `POST /api/register`, `POST /api/login`, `POST /api/logout`
/// - `GET /api/user` - Current user (session)
///
/// ## Session-authenticated
/// - `POST /api/business-info` - Billing details
/// - `POST /api/create-payment-intent` - Start a credit purchase
/// - `POST /api/credits/add`, `GET /api/credits/transactions`
/// - `GET /api/leads`, `POST /api/scrape`
/// - `POST /api/blog-posts`
///
/// ## Webhooks (verified per provider, not rate limited)
/// - `POST /api/stripe-webhook`
/// - `POST /api/mollie-webhook`
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Auth
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        // Payments
        .route("/api/business-info", post(business::update_business_info))
        .route(
            "/api/create-payment-intent",
            post(payments::create_payment_intent),
        )
        // Credits
        .route("/api/credits/add", post(credits::add_credits))
        .route("/api/credits/transactions", get(credits::list_transactions))
        // Leads
        .route("/api/leads", get(leads::list_leads))
        .route("/api/scrape", post(leads::scrape))
        // Blog
        .route(
            "/api/blog-posts",
            get(blog::list_blog_posts).post(blog::create_blog_post),
        )
        .route("/api/blog-posts/:id", get(blog::get_blog_post))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .merge(api_routes)
        .route("/api/stripe-webhook", post(webhooks::stripe_webhook))
        .route("/api/mollie-webhook", post(webhooks::mollie_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
///
/// Explicit origins may send the session cookie; `*` may not.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true)
    }
}
