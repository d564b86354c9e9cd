//! Lead records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LeadId, UserId};

/// Business name used for fabricated leads.
pub const PLACEHOLDER_BUSINESS_NAME: &str = "Example Business";

/// Category used when a scrape request does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// A business contact owned by exactly one user.
///
/// Leads are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Lead ID.
    pub id: LeadId,
    /// Owning user.
    pub user_id: UserId,
    /// Business name.
    pub business_name: String,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Website URL.
    pub website: Option<String>,
    /// Business category.
    pub category: Option<String>,
    /// Free-form metadata (search query, source, ...).
    pub metadata: serde_json::Value,
    /// When the lead was stored.
    pub created_at: DateTime<Utc>,
}

/// The business fields of a lead before it is assigned an ID and owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    /// Business name.
    pub business_name: String,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Website URL.
    pub website: Option<String>,
    /// Business category.
    pub category: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewLead {
    /// The static lead handed out by the mock scraper.
    #[must_use]
    pub fn placeholder(query: Option<&str>, location: Option<&str>, category: Option<&str>) -> Self {
        Self {
            business_name: PLACEHOLDER_BUSINESS_NAME.to_string(),
            address: Some("Musterstraße 1, 10115 Berlin".to_string()),
            phone: Some("+49 30 123456".to_string()),
            email: Some("info@example-business.de".to_string()),
            website: Some("https://example-business.de".to_string()),
            category: Some(category.unwrap_or(DEFAULT_CATEGORY).to_string()),
            metadata: serde_json::json!({
                "source": "mock",
                "query": query,
                "location": location,
            }),
        }
    }

    /// Assign an ID and owner.
    #[must_use]
    pub fn into_lead(self, user_id: UserId) -> Lead {
        Lead {
            id: LeadId::generate(),
            user_id,
            business_name: self.business_name,
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            category: self.category,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}
