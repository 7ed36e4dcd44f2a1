use crate::db::models::{PaymentStatus, PixPayment};
use crate::error::ApiError;
use crate::session::AdminUser;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub completed_amount_cents: i64,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PaymentSummary {
    pub fn of(payments: &[PixPayment]) -> Self {
        payments
            .iter()
            .fold(PaymentSummary::default(), |mut acc, p| {
                match p.status {
                    PaymentStatus::Pending => acc.pending += 1,
                    PaymentStatus::Completed => {
                        acc.completed += 1;
                        acc.completed_amount_cents += p.amount_cents;
                    }
                    PaymentStatus::Failed => acc.failed += 1,
                }
                acc
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
}

pub async fn list(
    Extension(app_state): Extension<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let payments = app_state.store.list_payments().await?;
    let summary = PaymentSummary::of(&payments);
    Ok(Json(serde_json::json!({
        "payments": payments,
        "summary": summary,
    })))
}

pub async fn update_status(
    Extension(app_state): Extension<AppState>,
    admin: AdminUser,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = app_state.store.as_ref();
    let current = store
        .get_payment(payment_id)
        .await?
        .ok_or(ApiError::NotFound("Payment"))?;

    if !current.status.can_transition_to(payload.status) {
        return Err(ApiError::Conflict(format!(
            "payment is {} and cannot become {}",
            current.status.as_str(),
            payload.status.as_str()
        )));
    }

    // the store only settles rows still pending
    let updated = store
        .settle_payment(payment_id, payload.status)
        .await?
        .ok_or_else(|| ApiError::Conflict("payment was already settled".to_string()))?;
    info!(
        "payment {} marked {} by {}",
        payment_id,
        updated.status.as_str(),
        admin.id
    );
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payment(status: PaymentStatus, amount_cents: i64) -> PixPayment {
        PixPayment {
            id: Uuid::new_v4(),
            amount_cents,
            status,
            qr_code: "pref".to_string(),
            user_id: Uuid::new_v4(),
            vote_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_sums_only_completed_amounts() {
        let payments = vec![
            payment(PaymentStatus::Completed, 250),
            payment(PaymentStatus::Completed, 250),
            payment(PaymentStatus::Pending, 250),
            payment(PaymentStatus::Failed, 250),
        ];
        assert_eq!(
            PaymentSummary::of(&payments),
            PaymentSummary {
                completed_amount_cents: 500,
                pending: 1,
                completed: 2,
                failed: 1,
            }
        );
    }
}
