//! Webhook handlers for Stripe and Mollie.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::payments::{extract_credit_metadata, PaymentStatus, ProviderKind};
use crate::state::AppState;

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
    /// Set when the payment had already been credited.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    handle_webhook(&state, ProviderKind::Stripe, &headers, &body).await
}

/// Handle Mollie webhooks.
pub async fn mollie_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    handle_webhook(&state, ProviderKind::Mollie, &headers, &body).await
}

async fn handle_webhook(
    state: &AppState,
    kind: ProviderKind,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<WebhookResponse>, ApiError> {
    let provider = state
        .payment_provider(kind)
        .ok_or_else(|| ApiError::ServiceUnavailable(format!("{kind} payments are not configured")))?;

    let payment = provider.verify_webhook(headers, body).await.map_err(|e| {
        tracing::warn!(provider = %kind, error = %e, "Webhook verification failed");
        if e.is_configuration() {
            ApiError::ServiceUnavailable(format!("{kind} webhooks are not configured"))
        } else {
            ApiError::BadRequest("Webhook verification failed".into())
        }
    })?;

    if payment.status != PaymentStatus::Succeeded {
        tracing::debug!(
            provider = %kind,
            payment_id = %payment.payment_id,
            status = ?payment.status,
            "Webhook acknowledged without crediting"
        );
        return Ok(Json(WebhookResponse {
            received: true,
            duplicate: false,
        }));
    }

    let purchase = extract_credit_metadata(&payment.metadata).map_err(|e| {
        tracing::error!(
            provider = %kind,
            payment_id = %payment.payment_id,
            error = %e,
            "Paid payment carries unusable metadata"
        );
        ApiError::from(e)
    })?;

    let balance = state
        .ledger
        .credit_purchase(
            kind.as_str(),
            &payment.payment_id,
            purchase.user_id,
            purchase.credit_amount,
        )
        .await?;

    Ok(Json(WebhookResponse {
        received: true,
        duplicate: balance.is_none(),
    }))
}
