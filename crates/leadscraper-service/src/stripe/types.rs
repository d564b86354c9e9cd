//! Stripe API types.

use serde::Deserialize;

/// Stripe customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    /// Stripe customer ID.
    pub id: String,
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Customer name.
    #[serde(default)]
    pub name: Option<String>,
    /// Metadata attached to the customer.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Stripe `PaymentIntent` object.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Payment intent ID.
    pub id: String,
    /// Amount in the smallest currency unit.
    #[serde(default)]
    pub amount: i64,
    /// Currency (e.g., "eur").
    #[serde(default)]
    pub currency: String,
    /// Status (`requires_payment_method`, `succeeded`, ...).
    #[serde(default)]
    pub status: String,
    /// Secret the browser uses to confirm the payment.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentParams<'a> {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Currency code.
    pub currency: &'a str,
    /// Shown on the customer's statement and in the dashboard.
    pub description: &'a str,
    /// Existing customer to attach the payment to.
    pub customer: Option<&'a str>,
    /// Metadata key/value pairs.
    pub metadata: &'a [(&'a str, String)],
}

/// Stripe webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID.
    pub id: String,
    /// Event type (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: WebhookEventData,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
}

/// Webhook event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The event object.
    pub object: serde_json::Value,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}
