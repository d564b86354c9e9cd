//! Mollie API types.

use serde::{Deserialize, Serialize};

/// Money amount as Mollie expects it: currency code plus a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// ISO 4217 currency code, upper case.
    pub currency: String,
    /// Decimal value with exactly two fraction digits, e.g. `"12.34"`.
    pub value: String,
}

/// Body of `POST /v2/payments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    /// Amount to charge.
    pub amount: Amount,
    /// Shown to the customer.
    pub description: String,
    /// Where the customer lands after checkout.
    pub redirect_url: String,
    /// Where Mollie posts status changes. Must be publicly reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Metadata echoed back on every fetch.
    pub metadata: serde_json::Value,
}

/// Mollie payment object.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    /// Payment ID (`tr_...`).
    pub id: String,
    /// Status (`open`, `pending`, `authorized`, `paid`, `canceled`, `expired`, `failed`).
    pub status: String,
    /// Amount.
    pub amount: Amount,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Metadata set at creation.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// HAL links.
    #[serde(rename = "_links", default)]
    pub links: PaymentLinks,
}

impl Payment {
    /// Hosted checkout URL, if the payment is still open.
    #[must_use]
    pub fn checkout_url(&self) -> Option<&str> {
        self.links.checkout.as_ref().map(|link| link.href.as_str())
    }
}

/// Links attached to a payment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentLinks {
    /// Hosted checkout page.
    #[serde(default)]
    pub checkout: Option<Link>,
}

/// A single HAL link.
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    /// Target URL.
    pub href: String,
}

/// Body of `application/x-www-form-urlencoded` Mollie webhook calls.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    /// The payment whose status changed.
    pub id: String,
}

/// Mollie API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct MollieErrorResponse {
    /// HTTP status.
    pub status: u16,
    /// Short error title.
    #[serde(default)]
    pub title: String,
    /// Error detail.
    #[serde(default)]
    pub detail: String,
}
