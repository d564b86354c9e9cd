//! Error types for LeadScraper storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The username is already registered.
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    /// Applying the change would make the balance negative.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Credits the change needed.
        required: i64,
    },

    /// Applying the change would overflow the balance.
    #[error("balance overflow: balance={balance}, amount={amount}")]
    BalanceOverflow {
        /// Current balance.
        balance: i64,
        /// Signed change that did not fit.
        amount: i64,
    },
}

impl StoreError {
    pub(crate) fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}
