//! Credit ledger.
//!
//! Every balance change goes through [`CreditLedger`], which validates the
//! amount and delegates the atomic check-and-update to the store. The store
//! also writes one `CreditTransaction` per change.

use std::sync::Arc;

use leadscraper_core::{CreditChange, CreditTransaction, UserId};
use leadscraper_store::{Store, StoreError};

/// Largest magnitude accepted for a single manual adjustment.
pub const MAX_CREDIT_ADJUSTMENT: i64 = 1_000_000;

/// Ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The requested amount is not acceptable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The store rejected the change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Credit balance operations.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
}

impl CreditLedger {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Apply a signed delta to a user's balance and return the new balance.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `delta` is zero or larger in magnitude than
    ///   [`MAX_CREDIT_ADJUSTMENT`].
    /// - `StoreError::NotFound` for an unknown user.
    /// - `StoreError::InsufficientCredits` if the balance would become negative;
    ///   nothing is changed in that case.
    pub async fn add_credits(&self, user_id: UserId, delta: i64) -> Result<i64, LedgerError> {
        if delta == 0 {
            return Err(LedgerError::InvalidAmount("amount must not be zero".into()));
        }
        if delta.unsigned_abs() > MAX_CREDIT_ADJUSTMENT.unsigned_abs() {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be between -{MAX_CREDIT_ADJUSTMENT} and {MAX_CREDIT_ADJUSTMENT}"
            )));
        }

        let tx = self
            .store
            .apply_credit_change(&CreditChange::manual(user_id, delta))
            .await?;

        tracing::info!(
            user_id = %user_id,
            delta,
            balance = tx.balance_after,
            "Credits adjusted"
        );
        Ok(tx.balance_after)
    }

    /// Take one credit for a scrape and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InsufficientCredits` when the balance is zero.
    pub async fn deduct_for_scrape(&self, user_id: UserId) -> Result<i64, LedgerError> {
        let tx = self
            .store
            .apply_credit_change(&CreditChange::scrape(user_id))
            .await?;

        tracing::debug!(user_id = %user_id, balance = tx.balance_after, "Scrape credit deducted");
        Ok(tx.balance_after)
    }

    /// Give back the credit of a scrape that could not be completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn refund_scrape(&self, user_id: UserId) -> Result<i64, LedgerError> {
        let change = CreditChange {
            description: "Refund for failed scrape".into(),
            ..CreditChange::manual(user_id, 1)
        };
        let tx = self.store.apply_credit_change(&change).await?;
        Ok(tx.balance_after)
    }

    /// Credit a provider payment.
    ///
    /// Returns the new balance, or `None` if this payment was already
    /// credited.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `credits` is not positive.
    /// - `StoreError::NotFound` for an unknown user.
    pub async fn credit_purchase(
        &self,
        provider: &str,
        payment_id: &str,
        user_id: UserId,
        credits: i64,
    ) -> Result<Option<i64>, LedgerError> {
        if credits <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "purchased credit amount must be positive, got {credits}"
            )));
        }

        let change = CreditChange::purchase(user_id, credits, provider, payment_id);
        let outcome = self
            .store
            .credit_payment(provider, payment_id, &change)
            .await?;

        match &outcome {
            Some(tx) => tracing::info!(
                provider,
                payment_id,
                user_id = %user_id,
                credits,
                balance = tx.balance_after,
                "Payment credited"
            ),
            None => tracing::info!(provider, payment_id, "Payment already credited, skipping"),
        }

        Ok(outcome.map(|tx| tx.balance_after))
    }

    /// Ledger history for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>, LedgerError> {
        Ok(self.store.list_transactions(&user_id, limit, offset).await?)
    }
}
