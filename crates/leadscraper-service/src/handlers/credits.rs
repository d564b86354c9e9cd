//! Credit balance handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use leadscraper_core::CreditTransaction;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for transaction history.
const DEFAULT_TRANSACTIONS_LIMIT: usize = 50;

/// Maximum page size for transaction history.
const MAX_TRANSACTIONS_LIMIT: usize = 100;

/// Request body for `POST /api/credits/add`.
#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    /// Signed number of credits to add.
    #[serde(alias = "credits")]
    pub amount: i64,
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    /// Balance after the change.
    pub credits: i64,
}

/// Adjust the caller's balance.
pub async fn add_credits(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<AddCreditsRequest>, ApiError>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let credits = state.ledger.add_credits(auth.user.id, req.amount).await?;
    Ok(Json(CreditsResponse { credits }))
}

/// Pagination for transaction history.
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// Page size.
    pub limit: Option<usize>,
    /// Entries to skip.
    pub offset: Option<usize>,
}

/// Transaction history page.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    /// Entries, newest first.
    pub transactions: Vec<CreditTransaction>,
    /// Page size used.
    pub limit: usize,
    /// Entries skipped.
    pub offset: usize,
}

/// The caller's ledger history, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
        .clamp(1, MAX_TRANSACTIONS_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let transactions = state.ledger.history(auth.user.id, limit, offset).await?;

    Ok(Json(TransactionsResponse {
        transactions,
        limit,
        offset,
    }))
}
