use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewPayout, Payout, PayoutBatchStatus};

pub async fn insert_payout(payout: &NewPayout, conn: &mut SqliteConnection) -> Result<Payout, sqlx::Error> {
    let now = Utc::now();
    let payout: Payout = sqlx::query_as(
        r#"INSERT INTO payouts (reference, user_id, amount, status, initiated_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING *"#,
    )
    .bind(&payout.reference)
    .bind(&payout.user_id)
    .bind(payout.amount)
    .bind(PayoutBatchStatus::Processing)
    .bind(&payout.initiated_by)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🏦️ Payout {} of {} opened for {}", payout.reference, payout.amount, payout.user_id);
    Ok(payout)
}

pub async fn fetch_payout(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE reference = $1").bind(reference).fetch_optional(conn).await
}

pub async fn fetch_payouts_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE user_id = $1 ORDER BY id ASC").bind(user_id).fetch_all(conn).await
}

pub async fn set_transfer_code(
    reference: &str,
    transfer_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as("UPDATE payouts SET transfer_code = $1, updated_at = $2 WHERE reference = $3 RETURNING *")
        .bind(transfer_code)
        .bind(Utc::now())
        .bind(reference)
        .fetch_optional(conn)
        .await
}

/// Resolves a payout that is still `processing`. Returns `None` if it was already resolved (or does not exist).
pub async fn resolve_payout(
    reference: &str,
    status: PayoutBatchStatus,
    failure_reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE payouts SET status = $1, failure_reason = $2, updated_at = $3
        WHERE reference = $4 AND status = $5 RETURNING *"#,
    )
    .bind(status)
    .bind(failure_reason)
    .bind(Utc::now())
    .bind(reference)
    .bind(PayoutBatchStatus::Processing)
    .fetch_optional(conn)
    .await
}
