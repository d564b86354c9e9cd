//! PostgreSQL storage implementation.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, Row};

use leadscraper_core::{
    BlogPost, BlogPostId, BusinessInfo, CreditChange, CreditTransaction, Lead, LeadId,
    TransactionKind, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

/// Connection settings for [`PgStore`].
#[derive(Debug, Clone)]
pub struct PgStoreOptions {
    /// Connection URL (`postgres://...`).
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// Connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub initial_backoff: Duration,
}

impl PgStoreOptions {
    /// Options with the default pool size (10) and retry policy.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            connect_attempts: 5,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, retrying with exponential backoff, then run migrations.
    ///
    /// # Errors
    ///
    /// Returns the last connection error once all attempts are exhausted, or
    /// a migration error.
    pub async fn connect(options: &PgStoreOptions) -> Result<Self> {
        let attempts = options.connect_attempts.max(1);
        let mut backoff = options.initial_backoff;
        let mut attempt = 1;

        let pool = loop {
            let result = PgPoolOptions::new()
                .max_connections(options.max_connections)
                .acquire_timeout(options.acquire_timeout)
                .connect(&options.url)
                .await;

            match result {
                Ok(pool) => break pool,
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        retry_in = ?backoff,
                        error = %e,
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            max_connections = options.max_connections,
            "Connected to PostgreSQL"
        );

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn user_from_row(row: &PgRow) -> Result<User> {
    let business_info: Option<Json<BusinessInfo>> = row.try_get("business_info")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        credits: row.try_get("credits")?,
        stripe_customer_id: row.try_get("stripe_customer_id")?,
        business_info: business_info.map(|info| info.0),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn lead_from_row(row: &PgRow) -> Result<Lead> {
    Ok(Lead {
        id: LeadId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        business_name: row.try_get("business_name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        website: row.try_get("website")?,
        category: row.try_get("category")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<CreditTransaction> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    Ok(CreditTransaction {
        id: id
            .parse()
            .map_err(|_| StoreError::Serialization(format!("invalid transaction id: {id}")))?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        amount: row.try_get("amount")?,
        kind: TransactionKind::parse(&kind)
            .ok_or_else(|| StoreError::Serialization(format!("unknown transaction kind: {kind}")))?,
        balance_after: row.try_get("balance_after")?,
        description: row.try_get("description")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn blog_post_from_row(row: &PgRow) -> Result<BlogPost> {
    Ok(BlogPost {
        id: BlogPostId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: UserId::from_uuid(row.try_get("author_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_foreign_key_violation())
}

/// Apply a credit change on an open connection (usually inside a transaction).
async fn apply_change(conn: &mut PgConnection, change: &CreditChange) -> Result<CreditTransaction> {
    let updated = sqlx::query(
        "UPDATE users SET credits = credits + $2, updated_at = now() \
         WHERE id = $1 AND credits::numeric + $2 BETWEEN 0 AND 9223372036854775807 \
         RETURNING credits",
    )
    .bind(*change.user_id.as_uuid())
    .bind(change.amount)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = updated else {
        let current: Option<i64> = sqlx::query_scalar("SELECT credits FROM users WHERE id = $1")
            .bind(*change.user_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        return Err(match current {
            Some(balance) if balance.checked_add(change.amount).is_none() => {
                StoreError::BalanceOverflow {
                    balance,
                    amount: change.amount,
                }
            }
            Some(balance) => StoreError::InsufficientCredits {
                balance,
                required: change.amount.saturating_neg(),
            },
            None => StoreError::user_not_found(change.user_id),
        });
    };

    let balance_after: i64 = row.try_get("credits")?;
    let tx = change.clone().into_transaction(balance_after);

    sqlx::query(
        "INSERT INTO credit_transactions \
         (id, user_id, amount, kind, balance_after, description, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(tx.id.to_string())
    .bind(*tx.user_id.as_uuid())
    .bind(tx.amount)
    .bind(tx.kind.as_str())
    .bind(tx.balance_after)
    .bind(&tx.description)
    .bind(&tx.metadata)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(tx)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO users \
             (id, username, password_hash, credits, stripe_customer_id, business_info, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.credits)
        .bind(&user.stripe_customer_id)
        .bind(user.business_info.as_ref().map(Json))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateUsername(user.username.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn update_business_info(&self, user_id: &UserId, info: &BusinessInfo) -> Result<User> {
        sqlx::query(
            "UPDATE users SET business_info = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(*user_id.as_uuid())
        .bind(Json(info))
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()?
        .ok_or_else(|| StoreError::user_not_found(user_id))
    }

    async fn set_stripe_customer_id(&self, user_id: &UserId, customer_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET stripe_customer_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(*user_id.as_uuid())
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::user_not_found(user_id));
        }
        Ok(())
    }

    async fn apply_credit_change(&self, change: &CreditChange) -> Result<CreditTransaction> {
        let mut tx = self.pool.begin().await?;
        let applied = apply_change(&mut *tx, change).await?;
        tx.commit().await?;
        Ok(applied)
    }

    async fn credit_payment(
        &self,
        provider: &str,
        payment_id: &str,
        change: &CreditChange,
    ) -> Result<Option<CreditTransaction>> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO processed_payments (provider, payment_id, user_id, credit_amount) \
             VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(provider)
        .bind(payment_id)
        .bind(*change.user_id.as_uuid())
        .bind(change.amount)
        .execute(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(result) => result.rows_affected(),
            // The foreign key on user_id rejects unknown users.
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(StoreError::user_not_found(change.user_id));
            }
            Err(e) => return Err(e.into()),
        };

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let applied = apply_change(&mut *tx, change).await?;
        tx.commit().await?;
        Ok(Some(applied))
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        sqlx::query(
            "SELECT * FROM credit_transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(*user_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(transaction_from_row)
        .collect()
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO leads \
             (id, user_id, business_name, address, phone, email, website, category, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*lead.id.as_uuid())
        .bind(*lead.user_id.as_uuid())
        .bind(&lead.business_name)
        .bind(&lead.address)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.website)
        .bind(&lead.category)
        .bind(&lead.metadata)
        .bind(lead.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(StoreError::user_not_found(lead.user_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_leads(&self, user_id: &UserId) -> Result<Vec<Lead>> {
        sqlx::query("SELECT * FROM leads WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(*user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(lead_from_row)
            .collect()
    }

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<()> {
        sqlx::query(
            "INSERT INTO blog_posts (id, title, content, author_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*post.id.as_uuid())
        .bind(&post.title)
        .bind(&post.content)
        .bind(*post.author_id.as_uuid())
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_blog_post(&self, post_id: &BlogPostId) -> Result<Option<BlogPost>> {
        sqlx::query("SELECT * FROM blog_posts WHERE id = $1")
            .bind(*post_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(blog_post_from_row)
            .transpose()
    }

    async fn list_blog_posts(&self) -> Result<Vec<BlogPost>> {
        sqlx::query("SELECT * FROM blog_posts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(blog_post_from_row)
            .collect()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
