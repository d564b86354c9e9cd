//! Error types for LeadScraper domain operations.

use crate::ids::IdError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating domain input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required field was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The username is not a plausible e-mail address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// A field exceeded its maximum length.
    #[error("{field} exceeds {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
