use chrono::{DateTime, Utc};

use crate::{
    db_types::{Commission, NewPayout, Payout},
    traits::{data_objects::PayoutResolution, LedgerError},
};

#[allow(async_fn_in_trait)]
pub trait SettlementManagement {
    /// Moves `pending_settlement` commissions created at or before `cutoff` to `ready_for_payout`.
    /// Returns the commissions that changed, which is empty if the sweep has nothing to do.
    async fn mature_commissions(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Commission>, LedgerError>;

    /// The user's `ready_for_payout` and `failed` commissions, oldest first.
    async fn fetch_payout_eligible_commissions(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError>;

    /// Opens a payout batch: inserts the payout record and moves every listed commission to `processing`, atomically.
    ///
    /// If any commission is no longer eligible (e.g. a concurrent payout claimed it), nothing is changed and
    /// [`LedgerError::InvalidTransition`] is returned.
    async fn open_payout(&self, payout: NewPayout) -> Result<Payout, LedgerError>;

    async fn record_transfer_code(&self, reference: &str, transfer_code: &str) -> Result<Payout, LedgerError>;

    /// `processing → paid` for the batch and its commissions, and debits the pending wallet balance.
    /// Idempotent: a batch that is already resolved is reported as such and left untouched.
    async fn complete_payout(&self, reference: &str) -> Result<PayoutResolution, LedgerError>;

    /// `processing → failed` for the batch and its commissions. The wallet is not touched.
    /// Idempotent in the same way as [`SettlementManagement::complete_payout`].
    async fn fail_payout(&self, reference: &str, reason: &str) -> Result<PayoutResolution, LedgerError>;

    async fn fetch_payout(&self, reference: &str) -> Result<Option<Payout>, LedgerError>;

    async fn fetch_payouts_for_user(&self, user_id: &str) -> Result<Vec<Payout>, LedgerError>;

    async fn fetch_commissions_for_payout(&self, reference: &str) -> Result<Vec<Commission>, LedgerError>;
}
