//! Business details handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use axum_extra::extract::WithRejection;

use leadscraper_core::BusinessInfo;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::auth::UserResponse;
use crate::state::AppState;

/// Save the user's billing details.
///
/// Also registers the user as a Stripe customer the first time, when Stripe
/// is configured. A Stripe failure is logged and does not fail the request.
pub async fn update_business_info(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    WithRejection(Json(info), _): WithRejection<Json<BusinessInfo>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    let info = info.validated()?;
    let mut user = state.store.update_business_info(&auth.user.id, &info).await?;

    let stripe = state.stripe().filter(|_| user.stripe_customer_id.is_none());
    if let Some(stripe) = stripe {
        match stripe
            .create_customer(
                &user.id.to_string(),
                Some(&user.username),
                Some(&info.company_name),
            )
            .await
        {
            Ok(customer) => {
                state
                    .store
                    .set_stripe_customer_id(&user.id, &customer.id)
                    .await?;
                tracing::info!(user_id = %user.id, customer_id = %customer.id, "Stripe customer created");
                user.stripe_customer_id = Some(customer.id);
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to create Stripe customer");
            }
        }
    }

    Ok(Json(UserResponse::from(&user)))
}
