//! Server-side sessions.
//!
//! A session is a random id mapped to a user. The browser only ever holds the
//! id, signed with `SESSION_SECRET`, in the `leadscraper.sid` cookie:
//!
//! ```text
//! leadscraper.sid=<64 hex chars>.<hmac-sha256(secret, id) as hex>
//! ```
//!
//! Two backends implement [`SessionStore`]: [`MemorySessionStore`] for
//! development and tests, and [`RedisSessionStore`] when `REDIS_URL` is set.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use leadscraper_core::UserId;

use crate::crypto::{constant_time_eq, hmac_sha256_hex, random_token};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "leadscraper.sid";

/// Random bytes in a session id.
const SESSION_ID_BYTES: usize = 32;

/// Redis key prefix for sessions.
const REDIS_KEY_PREFIX: &str = "leadscraper:session:";

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The logged-in user.
    pub user_id: UserId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn new(user_id: UserId, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(7));
        Self {
            user_id,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Errors from a session backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored session could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage for server-side sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `user_id` and return its id.
    async fn create(&self, user_id: UserId, ttl: Duration) -> Result<String, SessionError>;

    /// Look up a live session. Expired sessions are treated as absent.
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    /// End a session. Unknown ids are ignored.
    async fn destroy(&self, session_id: &str) -> Result<(), SessionError>;

    /// Name of the backend, for logging.
    fn backend(&self) -> &'static str;
}

// ============================================================================
// Memory backend
// ============================================================================

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: UserId, ttl: Duration) -> Result<String, SessionError> {
        let id = random_token(SESSION_ID_BYTES);
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired_at(now));
        sessions.insert(id.clone(), Session::new(user_id, ttl));
        Ok(id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|s| !s.is_expired_at(Utc::now()))
            .cloned())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Redis backend
// ============================================================================

/// Session store backed by Redis keys with a TTL.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisSessionStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }

    fn key(session_id: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{session_id}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: UserId, ttl: Duration) -> Result<String, SessionError> {
        let id = random_token(SESSION_ID_BYTES);
        let value = serde_json::to_string(&Session::new(user_id, ttl))?;

        let mut con = self.connection.clone();
        con.set_ex::<_, _, ()>(Self::key(&id), value, ttl.as_secs().max(1))
            .await?;
        Ok(id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let mut con = self.connection.clone();
        let value: Option<String> = con.get(Self::key(session_id)).await?;

        match value {
            Some(raw) => {
                let session: Session = serde_json::from_str(&raw)?;
                Ok(Some(session).filter(|s| !s.is_expired_at(Utc::now())))
            }
            None => Ok(None),
        }
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        let mut con = self.connection.clone();
        con.del::<_, ()>(Self::key(session_id)).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

// ============================================================================
// Cookie signing
// ============================================================================

/// Cookie value for a session id: `{id}.{signature}`.
#[must_use]
pub fn sign_session_id(session_id: &str, secret: &str) -> String {
    format!("{session_id}.{}", hmac_sha256_hex(secret, session_id))
}

/// Extract the session id from a signed cookie value.
///
/// Returns `None` if the value is malformed or the signature does not match.
#[must_use]
pub fn verify_session_cookie<'a>(value: &'a str, secret: &str) -> Option<&'a str> {
    let (session_id, signature) = value.rsplit_once('.')?;
    if session_id.is_empty() {
        return None;
    }

    let expected = hmac_sha256_hex(secret, session_id);
    constant_time_eq(&expected, signature).then_some(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_cookie_round_trip() {
        let value = sign_session_id("abc123", "secret");
        assert_eq!(verify_session_cookie(&value, "secret"), Some("abc123"));
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let value = sign_session_id("abc123", "secret");
        let forged = value.replacen("abc123", "abc124", 1);

        assert_eq!(verify_session_cookie(&forged, "secret"), None);
        assert_eq!(verify_session_cookie(&value, "other-secret"), None);
        assert_eq!(verify_session_cookie("abc123", "secret"), None);
        assert_eq!(verify_session_cookie(".deadbeef", "secret"), None);
    }

    #[tokio::test]
    async fn memory_sessions_create_get_destroy() {
        let store = MemorySessionStore::new();
        let user_id = UserId::generate();

        let id = store.create(user_id, Duration::from_secs(60)).await.unwrap();
        assert_eq!(id.len(), SESSION_ID_BYTES * 2);

        let session = store.get(&id).await.unwrap().unwrap();
        assert_eq!(session.user_id, user_id);

        store.destroy(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        store.destroy(&id).await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_are_absent() {
        let store = MemorySessionStore::new();
        let id = store
            .create(UserId::generate(), Duration::from_secs(0))
            .await
            .unwrap();

        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[test]
    fn expiry_boundary() {
        let session = Session::new(UserId::generate(), Duration::from_secs(10));
        assert!(!session.is_expired_at(session.created_at));
        assert!(session.is_expired_at(session.expires_at));
    }
}
