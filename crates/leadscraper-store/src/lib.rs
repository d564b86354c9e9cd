//! Storage layer for LeadScraper.
//!
//! This crate persists users, leads, blog posts and the credit ledger. Two
//! backends implement the [`Store`] trait:
//!
//! - [`MemoryStore`]: process-local maps, used in development and tests and as
//!   the degraded fallback when PostgreSQL is unreachable at startup
//! - [`PgStore`]: PostgreSQL through a pooled `sqlx` connection set, with
//!   embedded migrations
//!
//! # Credit invariant
//!
//! Balance changes go through [`Store::apply_credit_change`], which checks
//! and updates the balance in one atomic step and rejects any change that
//! would leave it below zero.
//!
//! # Example
//!
//! ```no_run
//! use leadscraper_core::{CreditChange, User};
//! use leadscraper_store::{MemoryStore, Store};
//!
//! # async fn example() -> leadscraper_store::Result<()> {
//! let store = MemoryStore::new();
//! let user = User::new("a@b.de".into(), "hash".into());
//! store.insert_user(&user).await?;
//!
//! let tx = store.apply_credit_change(&CreditChange::manual(user.id, 10)).await?;
//! assert_eq!(tx.balance_after, 10);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreOptions};

use async_trait::async_trait;
use leadscraper_core::{
    BlogPost, BlogPostId, BusinessInfo, CreditChange, CreditTransaction, Lead, User, UserId,
};

/// The storage trait defining all persistence operations.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateUsername` if the username is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Get a user by normalized username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Store business details on a user and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_business_info(&self, user_id: &UserId, info: &BusinessInfo) -> Result<User>;

    /// Remember the Stripe customer created for a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_stripe_customer_id(&self, user_id: &UserId, customer_id: &str) -> Result<()>;

    // =========================================================================
    // Credit ledger
    // =========================================================================

    /// Apply a signed balance change and record it in the ledger.
    ///
    /// The balance check and update are atomic.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance would drop below zero.
    async fn apply_credit_change(&self, change: &CreditChange) -> Result<CreditTransaction>;

    /// Credit a provider payment exactly once.
    ///
    /// Records `(provider, payment_id)` and applies `change` atomically.
    /// Returns `None` without touching the balance if the payment was already
    /// processed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn credit_payment(
        &self,
        provider: &str,
        payment_id: &str,
        change: &CreditChange,
    ) -> Result<Option<CreditTransaction>>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Leads
    // =========================================================================

    /// Insert a lead.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the owner doesn't exist.
    async fn insert_lead(&self, lead: &Lead) -> Result<()>;

    /// List a user's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_leads(&self, user_id: &UserId) -> Result<Vec<Lead>>;

    // =========================================================================
    // Blog
    // =========================================================================

    /// Insert a blog post.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_blog_post(&self, post: &BlogPost) -> Result<()>;

    /// Get a blog post by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_blog_post(&self, post_id: &BlogPostId) -> Result<Option<BlogPost>>;

    /// List blog posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_blog_posts(&self) -> Result<Vec<BlogPost>>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Name of the backend, for health reporting.
    fn backend(&self) -> &'static str;

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not answer.
    async fn ping(&self) -> Result<()>;
}
