//! Payment providers.
//!
//! [`PaymentProvider`] puts Stripe and Mollie behind one interface:
//!
//! - [`create_intent`](PaymentProvider::create_intent) creates the
//!   provider-side payment with `userId` and `creditAmount` in its metadata
//! - [`verify_webhook`](PaymentProvider::verify_webhook) authenticates a
//!   webhook call and reports the payment it concerns
//!
//! Reconciliation (crediting the user) happens in the webhook handlers via
//! [`extract_credit_metadata`] and the credit ledger.

use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use leadscraper_core::UserId;

use crate::mollie::{self, format_amount, MollieClient, MollieError};
use crate::stripe::{PaymentIntentParams, StripeClient, StripeError};

/// Stripe header carrying the webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Metadata key holding the purchasing user.
pub const METADATA_USER_ID: &str = "userId";

/// Metadata key holding the number of credits bought.
pub const METADATA_CREDIT_AMOUNT: &str = "creditAmount";

/// Payment errors.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Stripe call or verification failed.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// Mollie call or verification failed.
    #[error(transparent)]
    Mollie(#[from] MollieError),

    /// Provider metadata lacks a usable user or credit amount.
    #[error("invalid payment metadata: {0}")]
    InvalidMetadata(String),
}

impl PaymentError {
    /// Whether the provider is missing configuration needed for the call.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Stripe(StripeError::Configuration(_)))
    }
}

/// Which provider handled a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Stripe payment intents.
    #[default]
    Stripe,
    /// Mollie hosted checkout.
    Mollie,
}

impl ProviderKind {
    /// Lowercase provider name, as stored with processed payments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Mollie => "mollie",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user is buying.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// The purchasing user.
    pub user_id: UserId,
    /// Credits to grant once paid.
    pub credit_amount: i64,
    /// Price in the smallest currency unit.
    pub amount_cents: i64,
    /// Lowercase currency code.
    pub currency: String,
    /// Shown to the customer.
    pub description: String,
    /// Existing Stripe customer, if any.
    pub customer_id: Option<String>,
    /// Where Mollie sends the customer after checkout.
    pub redirect_url: String,
    /// Where Mollie posts status updates.
    pub webhook_url: Option<String>,
}

impl IntentRequest {
    fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            METADATA_USER_ID: self.user_id.to_string(),
            METADATA_CREDIT_AMOUNT: self.credit_amount,
        })
    }
}

/// A created provider-side payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Provider that holds the payment.
    pub provider: ProviderKind,
    /// Provider payment id (`pi_...` or `tr_...`).
    pub payment_id: String,
    /// Stripe client secret for confirming in the browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Mollie hosted checkout URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    /// Price in the smallest currency unit.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
}

/// Payment state reported by a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Money received; credits should be granted.
    Succeeded,
    /// Still in progress.
    Pending,
    /// Failed, canceled or expired.
    Failed,
    /// An event that does not concern a credit purchase.
    Ignored,
}

impl PaymentStatus {
    fn from_mollie(status: &str) -> Self {
        match status {
            "paid" => Self::Succeeded,
            "open" | "pending" | "authorized" => Self::Pending,
            "failed" | "canceled" | "expired" => Self::Failed,
            _ => Self::Ignored,
        }
    }

    fn from_stripe_event(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => Self::Succeeded,
            "payment_intent.processing" | "payment_intent.created" => Self::Pending,
            "payment_intent.payment_failed" | "payment_intent.canceled" => Self::Failed,
            _ => Self::Ignored,
        }
    }
}

/// An authenticated webhook notification.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// Provider that sent it.
    pub provider: ProviderKind,
    /// Payment the event concerns (event id for ignored events).
    pub payment_id: String,
    /// Payment status.
    pub status: PaymentStatus,
    /// Metadata attached at creation.
    pub metadata: serde_json::Value,
}

/// Purchase details recovered from provider metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditMetadata {
    /// User to credit.
    pub user_id: UserId,
    /// Credits to grant, always positive.
    pub credit_amount: i64,
}

/// Read `userId` and `creditAmount` from provider metadata.
///
/// Stripe stores metadata values as strings, Mollie keeps JSON types, so
/// `creditAmount` may be a number or a numeric string.
///
/// # Errors
///
/// Returns `InvalidMetadata` if either key is missing or malformed, or the
/// amount is not positive.
pub fn extract_credit_metadata(metadata: &serde_json::Value) -> Result<CreditMetadata, PaymentError> {
    let user_id = metadata
        .get(METADATA_USER_ID)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| PaymentError::InvalidMetadata(format!("missing {METADATA_USER_ID}")))?
        .parse::<UserId>()
        .map_err(|e| PaymentError::InvalidMetadata(e.to_string()))?;

    let credit_amount = match metadata.get(METADATA_CREDIT_AMOUNT) {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        PaymentError::InvalidMetadata(format!("missing or non-integer {METADATA_CREDIT_AMOUNT}"))
    })?;

    if credit_amount <= 0 {
        return Err(PaymentError::InvalidMetadata(format!(
            "{METADATA_CREDIT_AMOUNT} must be positive, got {credit_amount}"
        )));
    }

    Ok(CreditMetadata {
        user_id,
        credit_amount,
    })
}

/// A configured payment provider.
#[derive(Debug, Clone)]
pub enum PaymentProvider {
    /// Stripe.
    Stripe(StripeClient),
    /// Mollie.
    Mollie(MollieClient),
}

impl PaymentProvider {
    /// Which provider this is.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Stripe(_) => ProviderKind::Stripe,
            Self::Mollie(_) => ProviderKind::Mollie,
        }
    }

    /// Create the provider-side payment for a credit purchase.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the API call fails.
    pub async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        match self {
            Self::Stripe(client) => {
                let metadata = [
                    (METADATA_USER_ID, request.user_id.to_string()),
                    (METADATA_CREDIT_AMOUNT, request.credit_amount.to_string()),
                ];
                let intent = client
                    .create_payment_intent(&PaymentIntentParams {
                        amount: request.amount_cents,
                        currency: &request.currency,
                        description: &request.description,
                        customer: request.customer_id.as_deref(),
                        metadata: &metadata,
                    })
                    .await?;

                Ok(PaymentIntent {
                    provider: ProviderKind::Stripe,
                    payment_id: intent.id,
                    client_secret: intent.client_secret,
                    checkout_url: None,
                    amount: intent.amount,
                    currency: intent.currency,
                })
            }
            Self::Mollie(client) => {
                let payment = client
                    .create_payment(&mollie::CreatePayment {
                        amount: mollie::Amount {
                            currency: request.currency.to_ascii_uppercase(),
                            value: format_amount(request.amount_cents),
                        },
                        description: request.description.clone(),
                        redirect_url: request.redirect_url.clone(),
                        webhook_url: request.webhook_url.clone(),
                        metadata: request.metadata(),
                    })
                    .await?;

                Ok(PaymentIntent {
                    provider: ProviderKind::Mollie,
                    checkout_url: payment.checkout_url().map(ToString::to_string),
                    payment_id: payment.id,
                    client_secret: None,
                    amount: request.amount_cents,
                    currency: request.currency.clone(),
                })
            }
        }
    }

    /// Authenticate a webhook call and report the payment it concerns.
    ///
    /// Stripe checks the `Stripe-Signature` HMAC; Mollie fetches the payment
    /// named in the body back from its API.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be authenticated. Nothing about
    /// the payment should be trusted in that case.
    pub async fn verify_webhook(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<VerifiedPayment, PaymentError> {
        match self {
            Self::Stripe(client) => {
                let signature = headers
                    .get(STRIPE_SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(StripeError::InvalidSignature)?;
                let payload =
                    std::str::from_utf8(body).map_err(|_| StripeError::InvalidSignature)?;

                let event = client.construct_event(payload, signature)?;
                let status = PaymentStatus::from_stripe_event(&event.event_type);

                tracing::info!(
                    event_type = %event.event_type,
                    event_id = %event.id,
                    "Received Stripe webhook"
                );

                let object = event.data.object;
                let payment_id = match status {
                    PaymentStatus::Ignored => event.id,
                    _ => object
                        .get("id")
                        .and_then(serde_json::Value::as_str)
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            PaymentError::InvalidMetadata("payment intent without id".into())
                        })?,
                };

                Ok(VerifiedPayment {
                    provider: ProviderKind::Stripe,
                    payment_id,
                    status,
                    metadata: object.get("metadata").cloned().unwrap_or_default(),
                })
            }
            Self::Mollie(client) => {
                let payment = client.fetch_webhook_payment(body).await?;

                tracing::info!(
                    payment_id = %payment.id,
                    status = %payment.status,
                    "Received Mollie webhook"
                );

                Ok(VerifiedPayment {
                    provider: ProviderKind::Mollie,
                    status: PaymentStatus::from_mollie(&payment.status),
                    payment_id: payment.id,
                    metadata: payment.metadata,
                })
            }
        }
    }
}
