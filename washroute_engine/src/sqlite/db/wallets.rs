use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;
use washroute_common::Money;

use crate::{
    db_types::{LedgerEntry, TransactionType, WalletBalance, WalletTransaction},
    traits::LedgerError,
};

/// Applies a single ledger entry: the balance deltas and the transaction row.
///
/// This is *not* atomic on its own. Run it inside a transaction (every caller in this crate does) so that the
/// transaction log and the balances can never be observed out of step.
///
/// Balances are updated with an additive upsert (`x = x + delta`), so concurrent credits for the same user from
/// different orders do not clobber one another. An entry that takes money out of the pending balance is a conditional
/// update instead, and fails with a validation error if the pending balance does not cover it.
pub async fn apply_ledger_entry(entry: LedgerEntry, conn: &mut SqliteConnection) -> Result<WalletBalance, LedgerError> {
    if entry.amount.is_negative() {
        return Err(LedgerError::Validation(format!("Ledger amounts cannot be negative ({})", entry.amount)));
    }
    let now = Utc::now();
    let wallet = if entry.pending_delta().is_negative() {
        debit_pending_balance(&entry, now, conn).await?
    } else {
        upsert_balance(&entry, now, conn).await?
    };
    sqlx::query(
        r#"INSERT INTO wallet_transactions (user_id, tx_type, amount, description, order_id, performed_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(&entry.user_id)
    .bind(entry.tx_type)
    .bind(entry.amount)
    .bind(&entry.description)
    .bind(entry.order_id)
    .bind(&entry.performed_by)
    .bind(now)
    .execute(conn)
    .await?;
    trace!(
        "👛️ {} of {} recorded for {}. Earned: {}, pending: {}",
        entry.tx_type,
        entry.amount,
        entry.user_id,
        wallet.total_earned,
        wallet.pending_balance
    );
    Ok(wallet)
}

async fn upsert_balance(
    entry: &LedgerEntry,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<WalletBalance, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO wallets (user_id, total_earned, pending_balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                total_earned = total_earned + excluded.total_earned,
                pending_balance = pending_balance + excluded.pending_balance,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(&entry.user_id)
    .bind(entry.earned_delta())
    .bind(entry.pending_delta())
    .bind(now)
    .fetch_one(conn)
    .await
}

/// The pending balance may never go below zero. The check and the update are a single statement.
async fn debit_pending_balance(
    entry: &LedgerEntry,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<WalletBalance, LedgerError> {
    let wallet: Option<WalletBalance> = sqlx::query_as(
        r#"
            UPDATE wallets SET
                total_earned = total_earned + $2,
                pending_balance = pending_balance + $3,
                updated_at = $4
            WHERE user_id = $1 AND pending_balance + $3 >= 0
            RETURNING *;
        "#,
    )
    .bind(&entry.user_id)
    .bind(entry.earned_delta())
    .bind(entry.pending_delta())
    .bind(now)
    .fetch_optional(conn)
    .await?;
    wallet.ok_or_else(|| {
        LedgerError::Validation(format!(
            "The pending balance for {} does not cover a {} of {}",
            entry.user_id, entry.tx_type, entry.amount
        ))
    })
}

pub async fn fetch_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<WalletBalance>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_transactions(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Σ transaction amounts, signed by type, i.e. what `total_earned` should be.
pub async fn sum_signed_transactions(user_id: &str, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"SELECT COALESCE(SUM(CASE tx_type
            WHEN $2 THEN amount
            WHEN $3 THEN amount
            WHEN $4 THEN -amount
            ELSE 0 END), 0)
        FROM wallet_transactions WHERE user_id = $1"#,
    )
    .bind(user_id)
    .bind(TransactionType::Earning)
    .bind(TransactionType::Bonus)
    .bind(TransactionType::Deduction)
    .fetch_one(conn)
    .await?;
    Ok(Money::from(total))
}
