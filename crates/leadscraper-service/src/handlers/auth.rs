//! Registration, login and session handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Serialize;

use leadscraper_core::{BusinessInfo, User, UserId};

use crate::auth::{register as register_user, session_id_from_jar, AuthUser, Credentials};
use crate::error::ApiError;
use crate::session::{sign_session_id, SESSION_COOKIE};
use crate::state::AppState;

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User ID.
    pub id: UserId,
    /// Login e-mail.
    pub username: String,
    /// Credit balance.
    pub credits: i64,
    /// Stripe customer, once created.
    pub stripe_customer_id: Option<String>,
    /// Billing details.
    pub business_info: Option<BusinessInfo>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            credits: user.credits,
            stripe_customer_id: user.stripe_customer_id.clone(),
            business_info: user.business_info.clone(),
            created_at: user.created_at,
        }
    }
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always true.
    pub ok: bool,
}

/// Start a session for `user` and attach its cookie to `jar`.
async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, ApiError> {
    // Drop any session the browser already had.
    if let Some(old) = session_id_from_jar(&jar, &state.config.session_secret) {
        state.sessions.destroy(&old).await?;
    }

    let ttl = std::time::Duration::from_secs(state.config.session_ttl_seconds);
    let session_id = state.sessions.create(user.id, ttl).await?;

    let cookie = Cookie::build((
        SESSION_COOKIE,
        sign_session_id(&session_id, &state.config.session_secret),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(state.config.environment.is_production())
    .max_age(time::Duration::seconds(
        i64::try_from(state.config.session_ttl_seconds).unwrap_or(i64::MAX),
    ))
    .build();

    Ok(jar.add(cookie))
}

/// Create an account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(credentials), _): WithRejection<Json<Credentials>, ApiError>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>), ApiError> {
    let user = register_user(state.store.as_ref(), &credentials).await?;
    let jar = start_session(&state, jar, &user).await?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(&user))))
}

/// Log in with username and password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(credentials), _): WithRejection<Json<Credentials>, ApiError>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let user = state.authenticator.authenticate(&credentials).await?;
    let jar = start_session(&state, jar, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((jar, Json(UserResponse::from(&user))))
}

/// End the current session, if any.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    if let Some(session_id) = session_id_from_jar(&jar, &state.config.session_secret) {
        state.sessions.destroy(&session_id).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(LogoutResponse { ok: true })))
}

/// The logged-in user.
pub async fn current_user(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}
