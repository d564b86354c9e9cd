//! Mollie API client implementation.

use std::time::Duration;

use reqwest::Client;

use super::types::{CreatePayment, MollieErrorResponse, Payment, WebhookBody};

/// Error type for Mollie operations.
#[derive(Debug, thiserror::Error)]
pub enum MollieError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mollie API returned an error.
    #[error("Mollie API error ({status}): {title} - {detail}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Error title.
        title: String,
        /// Error detail.
        detail: String,
    },

    /// Webhook body did not name a payment.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Mollie API client.
#[derive(Debug, Clone)]
pub struct MollieClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MollieClient {
    /// Mollie API base URL.
    pub const BASE_URL: &'static str = "https://api.mollie.com/v2";

    /// Create a new Mollie client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, MollieError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (for tests and proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a payment and return it with its checkout link.
    pub async fn create_payment(&self, payment: &CreatePayment) -> Result<Payment, MollieError> {
        tracing::debug!(
            amount = %payment.amount.value,
            currency = %payment.amount.currency,
            "Creating Mollie payment"
        );

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payment)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch a payment by ID.
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, MollieError> {
        let response = self
            .client
            .get(format!("{}/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Parse a webhook body (`id=tr_...`) and fetch the payment it names.
    pub async fn fetch_webhook_payment(&self, body: &[u8]) -> Result<Payment, MollieError> {
        let webhook: WebhookBody = serde_urlencoded::from_bytes(body)
            .map_err(|e| MollieError::InvalidPayload(e.to_string()))?;

        let id = webhook.id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(MollieError::InvalidPayload(format!(
                "invalid payment id: {id:?}"
            )));
        }

        self.get_payment(id).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, MollieError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<MollieErrorResponse, _> = response.json().await;

        match error_body {
            Ok(err) => Err(MollieError::Api {
                status: err.status,
                title: err.title,
                detail: err.detail,
            }),
            Err(_) => Err(MollieError::Api {
                status: status.as_u16(),
                title: "unknown".to_string(),
                detail: format!("HTTP {status}"),
            }),
        }
    }
}

/// Format minor units as Mollie's decimal string (`1234` -> `"12.34"`).
#[must_use]
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}
