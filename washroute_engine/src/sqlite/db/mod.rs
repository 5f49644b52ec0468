//! # SQLite storage functions
//!
//! This module contains the "low-level" SQLite interactions for the ledger.
//!
//! Everything here is a plain function that accepts a `&mut SqliteConnection`. Callers either grab a connection from
//! the pool, or open a transaction and pass `&mut tx` through several of these calls to make them atomic.
//!
//! Functions that change state are written as conditional updates (`UPDATE … WHERE <expected state> RETURNING *`) so
//! that concurrent callers can never both win the same transition. A `None` result means the precondition no longer
//! held when the statement ran.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod audit;
pub mod commissions;
pub mod directory;
pub mod fee_config;
pub mod orders;
pub mod payouts;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/washroute.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("WRS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ WRS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// Creates a connection pool. The database file is created if it does not exist yet, and WAL mode is switched on so
/// that readers are not blocked by the single writer.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub(crate) fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(e) if e.is_unique_violation())
}
