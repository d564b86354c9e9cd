//! Scrape request and progress messages.
//!
//! These are the wire types of `POST /api/scrape`. In streaming mode the
//! server emits a sequence of [`ScrapeEvent`]s framed with
//! [`MESSAGE_DELIMITER`](crate::MESSAGE_DELIMITER).

use serde::{Deserialize, Serialize};

use crate::Lead;

/// Body of a scrape request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    /// Free-text search query.
    #[serde(default)]
    pub query: Option<String>,
    /// Location to search in.
    #[serde(default)]
    pub location: Option<String>,
    /// Business category.
    #[serde(default)]
    pub category: Option<String>,
    /// Emit framed progress messages instead of a single JSON body.
    #[serde(default)]
    pub stream: bool,
}

/// Result of a completed scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// The stored lead.
    pub lead: Lead,
    /// Balance after the scrape was paid for.
    pub credits: i64,
}

/// One message of a streamed scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScrapeEvent {
    /// Intermediate status update.
    Progress {
        /// Human readable status.
        message: String,
        /// Completion estimate, 0 to 100.
        percent: u8,
    },
    /// Final message of a successful scrape.
    Complete(ScrapeResult),
    /// Final message of a failed scrape.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ScrapeEvent {
    /// Build a progress message.
    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self::Progress {
            message: message.into(),
            percent: percent.min(100),
        }
    }

    /// Whether this message ends the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}
