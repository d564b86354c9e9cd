//! Request and response types for the LeadScraper client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leadscraper_core::{BusinessInfo, CreditTransaction, UserId};

/// Login or registration body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// A user as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Login e-mail.
    pub username: String,
    /// Credit balance.
    pub credits: i64,
    /// Stripe customer, once created.
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Billing details.
    #[serde(default)]
    pub business_info: Option<BusinessInfo>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Balance after a credit change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreditsResponse {
    /// New balance.
    pub credits: i64,
}

/// One page of credit history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsPage {
    /// Entries, newest first.
    pub transactions: Vec<CreditTransaction>,
    /// Page size used by the server.
    pub limit: usize,
    /// Entries skipped.
    pub offset: usize,
}

/// A started credit purchase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    /// `stripe` or `mollie`.
    pub provider: String,
    /// Provider payment ID.
    pub payment_id: String,
    /// Stripe client secret for confirming the payment in the browser.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Mollie hosted checkout page.
    #[serde(default)]
    pub checkout_url: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Credits granted once paid.
    pub credit_amount: i64,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
