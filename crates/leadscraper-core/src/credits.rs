//! Credit ledger types.
//!
//! Every balance change is described by a `CreditChange` and recorded as a
//! `CreditTransaction` once the store has applied it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// What caused a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits bought through a payment provider.
    Purchase,
    /// Credits added or removed through the credits endpoint.
    Manual,
    /// One credit consumed by a scrape.
    Scrape,
}

impl TransactionKind {
    /// Stable lowercase name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Manual => "manual",
            Self::Scrape => "scrape",
        }
    }

    /// Parse the stored name back.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purchase" => Some(Self::Purchase),
            "manual" => Some(Self::Manual),
            "scrape" => Some(Self::Scrape),
            _ => None,
        }
    }
}

/// A requested balance change, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditChange {
    /// The user whose balance changes.
    pub user_id: UserId,
    /// Signed amount (positive = credit, negative = debit).
    pub amount: i64,
    /// What caused the change.
    pub kind: TransactionKind,
    /// Human-readable description.
    pub description: String,
    /// Additional metadata (provider, payment id, ...).
    pub metadata: serde_json::Value,
}

impl CreditChange {
    /// Credits purchased through a payment provider.
    #[must_use]
    pub fn purchase(user_id: UserId, amount: i64, provider: &str, payment_id: &str) -> Self {
        Self {
            user_id,
            amount,
            kind: TransactionKind::Purchase,
            description: format!("Purchased {amount} credits via {provider}"),
            metadata: serde_json::json!({ "provider": provider, "paymentId": payment_id }),
        }
    }

    /// A manual adjustment.
    #[must_use]
    pub fn manual(user_id: UserId, amount: i64) -> Self {
        Self {
            user_id,
            amount,
            kind: TransactionKind::Manual,
            description: format!("Manual adjustment of {amount} credits"),
            metadata: serde_json::Value::Null,
        }
    }

    /// One credit consumed by a scrape.
    #[must_use]
    pub fn scrape(user_id: UserId) -> Self {
        Self {
            user_id,
            amount: -1,
            kind: TransactionKind::Scrape,
            description: "Lead scrape".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Record the change as applied, with the resulting balance.
    #[must_use]
    pub fn into_transaction(self, balance_after: i64) -> CreditTransaction {
        CreditTransaction {
            id: TransactionId::generate(),
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            balance_after,
            description: self.description,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

/// An applied balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    /// Transaction ID (ULID, time-ordered).
    pub id: TransactionId,
    /// The user whose balance changed.
    pub user_id: UserId,
    /// Signed amount.
    pub amount: i64,
    /// What caused the change.
    pub kind: TransactionKind,
    /// Balance after the change.
    pub balance_after: i64,
    /// Human-readable description.
    pub description: String,
    /// Additional metadata.
    pub metadata: serde_json::Value,
    /// When the change was applied.
    pub created_at: DateTime<Utc>,
}
