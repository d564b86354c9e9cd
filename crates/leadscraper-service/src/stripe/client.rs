//! Stripe API client implementation.

use std::time::Duration;

use reqwest::Client;

use super::types::{Customer, PaymentIntent, PaymentIntentParams, StripeErrorResponse, WebhookEvent};
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Maximum age of a signed webhook, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Webhook payload could not be parsed.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Invalid or stale webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    webhook_secret: Option<String>,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    pub const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (`whsec_...`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            webhook_secret,
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (for tests and proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether webhook signatures can be verified.
    #[must_use]
    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Create a new Stripe customer.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Our internal user ID (stored as metadata)
    /// * `email` - Optional customer email
    /// * `name` - Optional customer name
    pub async fn create_customer(
        &self,
        user_id: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<Customer, StripeError> {
        let mut params = vec![("metadata[userId]", user_id.to_string())];

        if let Some(email) = email {
            params.push(("email", email.to_string()));
        }
        if let Some(name) = name {
            params.push(("name", name.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/customers", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Create a payment intent the browser confirms with its client secret.
    pub async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams<'_>,
    ) -> Result<PaymentIntent, StripeError> {
        let mut form = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.to_string()),
            ("description".to_string(), params.description.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        if let Some(customer) = params.customer {
            form.push(("customer".to_string(), customer.to_string()));
        }
        for (key, value) in params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        tracing::debug!(
            amount = params.amount,
            currency = %params.currency,
            "Creating Stripe payment intent"
        );

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Verify a webhook signature against the current time and parse the event.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the `Stripe-Signature` header
    pub fn construct_event(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<WebhookEvent, StripeError> {
        self.verify_webhook_signature(payload, signature, chrono::Utc::now().timestamp())?;
        Ok(serde_json::from_str(payload)?)
    }

    /// Verify a `Stripe-Signature` header as seen at unix time `now`.
    ///
    /// The header has the form `t=timestamp,v1=signature[,v1=...]`. The
    /// signature is HMAC-SHA256 over `"{t}.{payload}"`; the timestamp must be
    /// within [`WEBHOOK_TOLERANCE_SECS`] of `now`.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
        now: i64,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", ts)) => timestamp = Some(ts),
                Some(("v1", sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_at: i64 = timestamp
            .parse()
            .map_err(|_| StripeError::InvalidSignature)?;
        if (now - signed_at).abs() > WEBHOOK_TOLERANCE_SECS {
            tracing::warn!(signed_at, now, "Stripe webhook timestamp outside tolerance");
            return Err(StripeError::InvalidSignature);
        }

        let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));

        if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

/// Build a `Stripe-Signature` header for `payload`, as Stripe would.
#[must_use]
pub fn sign_webhook_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let signature = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    format!("t={timestamp},v1={signature}")
}
