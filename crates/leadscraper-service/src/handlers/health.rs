//! Health check handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// How long the store probe may take.
const STORE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Storage backend in use.
    pub store: &'static str,
    /// Session backend in use.
    pub sessions: &'static str,
}

/// Health check endpoint. Returns 503 when the store does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match tokio::time::timeout(STORE_PROBE_TIMEOUT, state.store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Store health probe failed");
            false
        }
        Err(_) => {
            tracing::warn!("Store health probe timed out");
            false
        }
    };

    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            service: "leadscraper",
            version: env!("CARGO_PKG_VERSION"),
            store: state.store.backend(),
            sessions: state.sessions.backend(),
        }),
    )
}
