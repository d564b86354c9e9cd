//! Lead listing and the scrape endpoint.
//!
//! Scraping is simulated: each call pays one credit and stores one lead
//! with fixed placeholder contact details.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::WithRejection;

use leadscraper_core::{encode_message, Lead, NewLead, ScrapeEvent, ScrapeRequest, ScrapeResult, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Content type of framed progress streams.
pub const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// The caller's leads, newest first.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let leads = state.store.list_leads(&auth.user.id).await?;
    Ok(Json(leads))
}

/// Pay one credit and store one lead.
///
/// Responds with a single [`ScrapeResult`], or with framed [`ScrapeEvent`]s
/// when the request sets `stream`. The credit is taken before the response
/// starts, so a zero balance is always a plain 403.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    WithRejection(Json(request), _): WithRejection<Json<ScrapeRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let user_id = auth.user.id;
    let credits = state.ledger.deduct_for_scrape(user_id).await?;

    if request.stream {
        return Ok(stream_scrape(state, user_id, request, credits));
    }

    let lead = store_lead(&state, user_id, &request).await?;
    Ok(Json(ScrapeResult { lead, credits }).into_response())
}

/// Store the placeholder lead, refunding the credit if that fails.
async fn store_lead(
    state: &AppState,
    user_id: UserId,
    request: &ScrapeRequest,
) -> Result<Lead, ApiError> {
    let lead = NewLead::placeholder(
        request.query.as_deref(),
        request.location.as_deref(),
        request.category.as_deref(),
    )
    .into_lead(user_id);

    if let Err(e) = state.store.insert_lead(&lead).await {
        tracing::error!(user_id = %user_id, error = %e, "Failed to store lead, refunding credit");
        if let Err(refund) = state.ledger.refund_scrape(user_id).await {
            tracing::error!(user_id = %user_id, error = %refund, "Scrape refund failed");
        }
        return Err(e.into());
    }

    tracing::info!(user_id = %user_id, lead_id = %lead.id, "Lead scraped");
    Ok(lead)
}

fn stream_scrape(
    state: Arc<AppState>,
    user_id: UserId,
    request: ScrapeRequest,
    credits: i64,
) -> Response {
    let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes, Infallible>>();

    tokio::spawn(async move {
        let send = |event: &ScrapeEvent| match encode_message(event) {
            Ok(frame) => {
                // Fails only after the client disconnected; the lead is stored regardless.
                let _ = tx.unbounded_send(Ok(Bytes::from(frame)));
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode progress message"),
        };

        let target = request
            .query
            .as_deref()
            .or(request.category.as_deref())
            .unwrap_or("businesses");
        send(&ScrapeEvent::progress(format!("Searching for {target}"), 10));
        send(&ScrapeEvent::progress("Collecting contact details", 60));

        let last = match store_lead(&state, user_id, &request).await {
            Ok(lead) => ScrapeEvent::Complete(ScrapeResult { lead, credits }),
            Err(_) => ScrapeEvent::Error {
                message: "Failed to store lead; the credit was refunded".into(),
            },
        };
        send(&last);
    });

    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(rx),
    )
        .into_response()
}
