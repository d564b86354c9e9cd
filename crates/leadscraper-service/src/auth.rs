//! Authentication.
//!
//! - [`Authenticator`] checks login credentials; [`PasswordAuthenticator`] is
//!   the argon2-backed implementation used by the service.
//! - [`register`] creates an account with a hashed password.
//! - [`AuthUser`] resolves the signed session cookie to a stored user.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use leadscraper_core::{normalize_username, User};
use leadscraper_store::{Store, StoreError};

use crate::crypto::{hash_password, verify_password};
use crate::error::ApiError;
use crate::session::{verify_session_cookie, SESSION_COOKIE};
use crate::state::AppState;

/// Upper bound on accepted password length.
const MAX_PASSWORD_LEN: usize = 1024;

/// Login or registration credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// The login e-mail.
    #[serde(alias = "email")]
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown user or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Registration input was rejected.
    #[error("{0}")]
    InvalidInput(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Verifies login credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return the user the credentials belong to.
    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AuthError>;
}

/// Username/password authentication against the store.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    store: Arc<dyn Store>,
}

impl PasswordAuthenticator {
    /// Create an authenticator over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let username =
            normalize_username(&credentials.username).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(user) = self.store.get_user_by_username(&username).await? else {
            tracing::debug!(username = %username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let password = credentials.password.clone();
        let stored_hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        if valid {
            Ok(user)
        } else {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Create a new account with zero credits.
///
/// # Errors
///
/// - `InvalidInput` for a malformed e-mail or an empty password.
/// - `StoreError::DuplicateUsername` if the e-mail is already registered.
pub async fn register(store: &dyn Store, credentials: &Credentials) -> Result<User, AuthError> {
    let username = normalize_username(&credentials.username)
        .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

    if credentials.password.is_empty() {
        return Err(AuthError::InvalidInput("password must not be empty".into()));
    }
    if credentials.password.len() > MAX_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }

    let password = credentials.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    let user = User::new(username, password_hash);
    store.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Session id carried by a request, if its cookie is present and correctly signed.
#[must_use]
pub fn session_id_from_jar(jar: &CookieJar, secret: &str) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    verify_session_cookie(cookie.value(), secret).map(ToString::to_string)
}

/// A request made with a valid session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The logged-in user, as currently stored.
    pub user: User,
    /// The session the request was made with.
    pub session_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id =
            session_id_from_jar(&jar, &state.config.session_secret).ok_or(ApiError::Unauthorized)?;

        let session = state
            .sessions
            .get(&session_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        let user = state
            .store
            .get_user(&session.user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self { user, session_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscraper_store::MemoryStore;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = register(store.as_ref(), &credentials(" A@B.de ", "pw"))
            .await
            .unwrap();

        assert_eq!(user.username, "a@b.de");
        assert_eq!(user.credits, 0);
        assert_ne!(user.password_hash, "pw");

        let auth = PasswordAuthenticator::new(store);
        let found = auth.authenticate(&credentials("a@b.de", "pw")).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        register(store.as_ref(), &credentials("a@b.de", "pw"))
            .await
            .unwrap();
        let auth = PasswordAuthenticator::new(store);

        for creds in [
            credentials("a@b.de", "nope"),
            credentials("x@b.de", "pw"),
            credentials("not-an-email", "pw"),
        ] {
            assert!(matches!(
                auth.authenticate(&creds).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let store = MemoryStore::new();

        assert!(matches!(
            register(&store, &credentials("nope", "pw")).await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&store, &credentials("a@b.de", "")).await,
            Err(AuthError::InvalidInput(_))
        ));

        register(&store, &credentials("a@b.de", "pw")).await.unwrap();
        assert!(matches!(
            register(&store, &credentials("A@B.DE", "other")).await,
            Err(AuthError::Store(StoreError::DuplicateUsername(_)))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", credentials("a@b.de", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
