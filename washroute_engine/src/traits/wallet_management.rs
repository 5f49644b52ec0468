use crate::{
    db_types::{LedgerEntry, WalletBalance, WalletTransaction},
    traits::{data_objects::LedgerTotals, LedgerError},
};

/// The wallet ledger. Balances only ever change through [`WalletManagement::record_ledger_entry`].
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Appends the transaction and applies the matching balance deltas atomically. Creates the wallet if needed.
    async fn record_ledger_entry(&self, entry: LedgerEntry) -> Result<WalletBalance, LedgerError>;

    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<WalletBalance>, LedgerError>;

    async fn fetch_wallet_transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, LedgerError>;

    /// Recomputes the balances from first principles (transaction log and unpaid commissions).
    async fn ledger_totals(&self, user_id: &str) -> Result<LedgerTotals, LedgerError>;
}
