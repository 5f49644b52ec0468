use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};
use washroute_common::Money;

use crate::db_types::{Commission, NewCommission, PayoutStatus};

/// Inserts a commission unless one already exists for the same order and beneficiary role.
///
/// The `UNIQUE(order_id, beneficiary_role)` constraint makes this safe under concurrent callers: the loser of a race
/// gets `None` back and must not credit any wallet.
pub async fn insert_commission(
    commission: NewCommission,
    conn: &mut SqliteConnection,
) -> Result<Option<Commission>, sqlx::Error> {
    let now = Utc::now();
    let result: Option<Commission> = sqlx::query_as(
        r#"
            INSERT INTO commissions (
                order_id,
                beneficiary_id,
                beneficiary_role,
                commission_type,
                amount,
                calculation,
                order_status,
                payout_status,
                confirmed_by,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (order_id, beneficiary_role) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(commission.order_id)
    .bind(commission.beneficiary_id)
    .bind(commission.beneficiary_role)
    .bind(commission.commission_type)
    .bind(commission.amount)
    .bind(Json(commission.calculation))
    .bind(commission.order_status)
    .bind(PayoutStatus::PendingSettlement)
    .bind(commission.confirmed_by)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    match &result {
        Some(c) => debug!("💸️ {c} created"),
        None => trace!("💸️ A {} commission already exists for order #{}", commission.beneficiary_role, commission.order_id),
    }
    Ok(result)
}

pub async fn fetch_commissions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM commissions WHERE order_id = $1 ORDER BY id ASC").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_commissions_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM commissions WHERE beneficiary_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_commissions_for_transfer(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM commissions WHERE transfer_reference = $1 ORDER BY id ASC")
        .bind(reference)
        .fetch_all(conn)
        .await
}

/// Moves every `pending_settlement` commission created at or before `cutoff` to `ready_for_payout`.
///
/// Re-running the sweep is harmless: commissions that already matured no longer match the `WHERE` clause.
pub async fn mature_commissions(
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    let matured: Vec<Commission> = sqlx::query_as(
        r#"UPDATE commissions SET payout_status = $1, ready_at = $2, updated_at = $2
        WHERE payout_status = $3 AND julianday(created_at) <= julianday($4)
        RETURNING *"#,
    )
    .bind(PayoutStatus::ReadyForPayout)
    .bind(now)
    .bind(PayoutStatus::PendingSettlement)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    debug!("💸️ {} commissions matured (cutoff {cutoff})", matured.len());
    Ok(matured)
}

/// The user's commissions that can go into a new payout, oldest first.
pub async fn fetch_payout_eligible(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Commission>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT * FROM commissions WHERE beneficiary_id = $1 AND payout_status IN ($2, $3)
        ORDER BY created_at ASC, id ASC"#,
    )
    .bind(user_id)
    .bind(PayoutStatus::ReadyForPayout)
    .bind(PayoutStatus::Failed)
    .fetch_all(conn)
    .await
}

/// Claims a commission for a payout batch. Returns `false` if the commission is not (or no longer) eligible, e.g.
/// because a concurrent payout already took it.
pub async fn claim_for_payout(
    id: i64,
    user_id: &str,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE commissions SET payout_status = $1, transfer_reference = $2, failure_reason = NULL, updated_at = $3
        WHERE id = $4 AND beneficiary_id = $5 AND payout_status IN ($6, $7)"#,
    )
    .bind(PayoutStatus::Processing)
    .bind(reference)
    .bind(Utc::now())
    .bind(id)
    .bind(user_id)
    .bind(PayoutStatus::ReadyForPayout)
    .bind(PayoutStatus::Failed)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Moves the `processing` commissions of a transfer batch to `paid`.
pub async fn mark_transfer_paid(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"UPDATE commissions SET payout_status = $1, paid_at = $2, updated_at = $2
        WHERE transfer_reference = $3 AND payout_status = $4 RETURNING *"#,
    )
    .bind(PayoutStatus::Paid)
    .bind(now)
    .bind(reference)
    .bind(PayoutStatus::Processing)
    .fetch_all(conn)
    .await
}

/// Moves the `processing` commissions of a transfer batch to `failed`, which makes them payout-eligible again.
pub async fn mark_transfer_failed(
    reference: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Commission>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE commissions SET payout_status = $1, failure_reason = $2, updated_at = $3
        WHERE transfer_reference = $4 AND payout_status = $5 RETURNING *"#,
    )
    .bind(PayoutStatus::Failed)
    .bind(reason)
    .bind(Utc::now())
    .bind(reference)
    .bind(PayoutStatus::Processing)
    .fetch_all(conn)
    .await
}

/// Sum of the user's commissions that have not been paid out yet.
pub async fn sum_unpaid_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM commissions WHERE beneficiary_id = $1 AND payout_status != $2")
            .bind(user_id)
            .bind(PayoutStatus::Paid)
            .fetch_one(conn)
            .await?;
    Ok(Money::from(total))
}
