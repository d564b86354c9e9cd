//! Credit purchase handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::payments::{IntentRequest, PaymentIntent, ProviderKind};
use crate::state::AppState;

/// Largest purchase accepted in one payment.
pub const MAX_CREDITS_PER_PURCHASE: i64 = 10_000;

/// Request body for `POST /api/create-payment-intent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Credits to buy.
    #[serde(alias = "credits")]
    pub credit_amount: i64,
    /// Provider to pay with (default: stripe).
    #[serde(default)]
    pub provider: ProviderKind,
}

/// Response for a created payment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    /// Provider-side payment.
    #[serde(flatten)]
    pub intent: PaymentIntent,
    /// Credits granted once paid.
    pub credit_amount: i64,
}

/// Start a credit purchase with the requested provider.
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<CreatePaymentIntentRequest>, ApiError>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    if !(1..=MAX_CREDITS_PER_PURCHASE).contains(&req.credit_amount) {
        return Err(ApiError::BadRequest(format!(
            "creditAmount must be between 1 and {MAX_CREDITS_PER_PURCHASE}"
        )));
    }

    let provider = state.payment_provider(req.provider).ok_or_else(|| {
        ApiError::ServiceUnavailable(format!("{} payments are not configured", req.provider))
    })?;

    let amount_cents = req
        .credit_amount
        .checked_mul(state.config.credit_price_cents)
        .ok_or_else(|| ApiError::BadRequest("amount too large".into()))?;

    let request = IntentRequest {
        user_id: auth.user.id,
        credit_amount: req.credit_amount,
        amount_cents,
        currency: state.config.currency.clone(),
        description: format!("{} LeadScraper credits", req.credit_amount),
        customer_id: auth.user.stripe_customer_id.clone(),
        redirect_url: state.config.public_url("/dashboard?payment=complete"),
        webhook_url: state
            .config
            .custom_domain
            .as_ref()
            .map(|_| state.config.public_url("/api/mollie-webhook")),
    };

    let intent = provider.create_intent(&request).await.map_err(|e| {
        tracing::error!(
            provider = %req.provider,
            user_id = %auth.user.id,
            error = %e,
            "Failed to create payment"
        );
        ApiError::Internal(e.to_string())
    })?;

    tracing::info!(
        provider = %intent.provider,
        payment_id = %intent.payment_id,
        user_id = %auth.user.id,
        credit_amount = req.credit_amount,
        amount_cents,
        "Payment created"
    );

    Ok(Json(CreatePaymentIntentResponse {
        intent,
        credit_amount: req.credit_amount,
    }))
}
