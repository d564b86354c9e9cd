//! In-memory storage implementation.
//!
//! All state lives behind one `RwLock`, so every compound operation (balance
//! check plus update, payment dedup plus credit) happens under a single write
//! guard.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use leadscraper_core::{
    BlogPost, BlogPostId, BusinessInfo, CreditChange, CreditTransaction, Lead, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    /// Per user, in insertion order.
    leads: HashMap<UserId, Vec<Lead>>,
    /// Per user, in insertion order.
    transactions: HashMap<UserId, Vec<CreditTransaction>>,
    processed_payments: HashSet<(String, String)>,
    blog_posts: Vec<BlogPost>,
}

impl Inner {
    fn apply(&mut self, change: &CreditChange) -> Result<CreditTransaction> {
        let user = self
            .users
            .get_mut(&change.user_id)
            .ok_or_else(|| StoreError::user_not_found(change.user_id))?;

        let new_balance = user
            .credits
            .checked_add(change.amount)
            .ok_or(StoreError::BalanceOverflow {
                balance: user.credits,
                amount: change.amount,
            })?;
        if new_balance < 0 {
            return Err(StoreError::InsufficientCredits {
                balance: user.credits,
                required: change.amount.saturating_neg(),
            });
        }

        user.credits = new_balance;
        user.updated_at = chrono::Utc::now();

        let tx = change.clone().into_transaction(new_balance);
        self.transactions
            .entry(change.user_id)
            .or_default()
            .push(tx.clone());

        Ok(tx)
    }
}

/// Process-local storage backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.usernames.contains_key(&user.username) {
            return Err(StoreError::DuplicateUsername(user.username.clone()));
        }

        inner.usernames.insert(user.username.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .usernames
            .get(username)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn update_business_info(&self, user_id: &UserId, info: &BusinessInfo) -> Result<User> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::user_not_found(user_id))?;

        user.business_info = Some(info.clone());
        user.updated_at = chrono::Utc::now();
        Ok(user.clone())
    }

    async fn set_stripe_customer_id(&self, user_id: &UserId, customer_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::user_not_found(user_id))?;

        user.stripe_customer_id = Some(customer_id.to_string());
        user.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn apply_credit_change(&self, change: &CreditChange) -> Result<CreditTransaction> {
        self.inner.write().await.apply(change)
    }

    async fn credit_payment(
        &self,
        provider: &str,
        payment_id: &str,
        change: &CreditChange,
    ) -> Result<Option<CreditTransaction>> {
        let mut inner = self.inner.write().await;
        let key = (provider.to_string(), payment_id.to_string());

        if inner.processed_payments.contains(&key) {
            return Ok(None);
        }

        let tx = inner.apply(change)?;
        inner.processed_payments.insert(key);
        Ok(Some(tx))
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .get(user_id)
            .map(|txs| txs.iter().rev().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&lead.user_id) {
            return Err(StoreError::user_not_found(lead.user_id));
        }

        inner
            .leads
            .entry(lead.user_id)
            .or_default()
            .push(lead.clone());
        Ok(())
    }

    async fn list_leads(&self, user_id: &UserId) -> Result<Vec<Lead>> {
        let inner = self.inner.read().await;
        Ok(inner
            .leads
            .get(user_id)
            .map(|leads| leads.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<()> {
        self.inner.write().await.blog_posts.push(post.clone());
        Ok(())
    }

    async fn get_blog_post(&self, post_id: &BlogPostId) -> Result<Option<BlogPost>> {
        let inner = self.inner.read().await;
        Ok(inner.blog_posts.iter().find(|p| p.id == *post_id).cloned())
    }

    async fn list_blog_posts(&self) -> Result<Vec<BlogPost>> {
        Ok(self.inner.read().await.blog_posts.iter().rev().cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
