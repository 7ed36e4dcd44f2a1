use crate::db::connection::DbPool;
use crate::db::models::{NewPayment, PaymentStatus, PixPayment};
use sqlx::postgres::PgRow;
use sqlx::{Error, Row};
use uuid::Uuid;

fn payment_from_row(r: &PgRow) -> Result<PixPayment, Error> {
    let status: String = r.get("status");
    Ok(PixPayment {
        id: r.get("id"),
        amount_cents: r.get("amount_cents"),
        status: status
            .parse::<PaymentStatus>()
            .map_err(|e| Error::Decode(e.into()))?,
        qr_code: r.get("qr_code"),
        user_id: r.get("user_id"),
        vote_id: r.get("vote_id"),
        created_at: r.get("created_at"),
    })
}

pub async fn create_payment(pool: &DbPool, payment: &NewPayment) -> Result<PixPayment, Error> {
    let payment_id = Uuid::new_v4();

    let row = sqlx::query(
        "INSERT INTO pix_payments (id, amount_cents, status, qr_code, user_id, vote_id) \
         VALUES ($1, $2, 'pending', $3, $4, $5) \
         RETURNING id, amount_cents, status, qr_code, user_id, vote_id, created_at",
    )
    .bind(payment_id)
    .bind(payment.amount_cents)
    .bind(&payment.qr_code)
    .bind(payment.user_id)
    .bind(payment.vote_id)
    .fetch_one(pool)
    .await?;

    payment_from_row(&row)
}

pub async fn get_payment(pool: &DbPool, payment_id: Uuid) -> Result<Option<PixPayment>, Error> {
    let row = sqlx::query(
        "SELECT id, amount_cents, status, qr_code, user_id, vote_id, created_at \
         FROM pix_payments WHERE id = $1",
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(payment_from_row).transpose()
}

pub async fn get_all_payments(pool: &DbPool) -> Result<Vec<PixPayment>, Error> {
    let rows = sqlx::query(
        "SELECT id, amount_cents, status, qr_code, user_id, vote_id, created_at \
         FROM pix_payments ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(payment_from_row).collect()
}

/// Moves a payment out of `pending`. Returns `None` when no pending row with
/// that id exists.
pub async fn settle_payment(
    pool: &DbPool,
    payment_id: Uuid,
    status: PaymentStatus,
) -> Result<Option<PixPayment>, Error> {
    let row = sqlx::query(
        "UPDATE pix_payments SET status = $2 WHERE id = $1 AND status = 'pending' \
         RETURNING id, amount_cents, status, qr_code, user_id, vote_id, created_at",
    )
    .bind(payment_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(payment_from_row).transpose()
}
