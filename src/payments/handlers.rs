use super::gateway::PaymentPreference;
use crate::completion;
use crate::db::models::NewPayment;
use crate::error::ApiError;
use crate::session::AuthUser;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

/// Session flag: the payment prompt was already shown or dismissed.
pub const PROMPTED_KEY: &str = "payment_prompted";

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub preference_id: String,
    pub redirect_url: String,
}

/// Creates a checkout preference for the caller and records it as a pending
/// payment. If the gateway or the store fails nothing is recorded and the
/// error is returned, so the prompt can retry.
pub async fn checkout(
    Extension(app_state): Extension<AppState>,
    session: Session,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let store = app_state.store.as_ref();

    let progress = completion::check(store, user.id).await?;
    if !progress.has_completed_all_votes {
        return Err(ApiError::Validation(
            "Vote in every election before paying".to_string(),
        ));
    }

    let PaymentPreference {
        preference_id,
        init_point,
        ..
    } = app_state
        .payments
        .create_preference(user.id)
        .await
        .map_err(|e| {
            error!("Error creating payment for {}: {}", user.id, e);
            ApiError::from(e)
        })?;

    let latest_vote = store
        .votes_for_user(user.id)
        .await?
        .into_iter()
        .max_by_key(|v| v.created_at)
        .map(|v| v.id);
    store
        .create_payment(&NewPayment {
            amount_cents: app_state.config.payment_price_cents,
            qr_code: preference_id.clone(),
            user_id: user.id,
            vote_id: latest_vote,
        })
        .await
        .map_err(|e| {
            error!("failed to record payment {} for {}: {}", preference_id, user.id, e);
            ApiError::from(e)
        })?;

    session.insert(PROMPTED_KEY, true).await?;

    info!("checkout {} created for {}", preference_id, user.id);
    Ok(Json(CheckoutResponse {
        preference_id,
        redirect_url: init_point,
    }))
}

pub async fn dismiss_prompt(session: Session, _user: AuthUser) -> Result<impl IntoResponse, ApiError> {
    session.insert(PROMPTED_KEY, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

/// Stand-in for the hosted `create-payment` function: takes `{ userId }`,
/// answers `{ preferenceId, initPoint, sandboxInitPoint }`, and every
/// failure is a 500 with `{ error }`.
pub async fn create_payment_function(
    Extension(app_state): Extension<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let user_id = match payload {
        Ok(Json(request)) => request.user_id,
        Err(rejection) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": rejection.body_text() })),
            );
        }
    };

    match app_state.payments.create_preference(user_id).await {
        Ok(preference) => (StatusCode::OK, Json(json!(preference))),
        Err(e) => {
            error!("Error creating payment: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
