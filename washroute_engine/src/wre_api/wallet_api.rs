use std::fmt::{Debug, Display};

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use washroute_common::Money;

use crate::{
    db_types::{AdjustmentType, LedgerEntry, NewAuditEntry, TransactionType, WalletBalance, WalletTransaction},
    traits::{AuditLog, LedgerError, WalletManagement},
    wre_api::record_audit,
};

/// The wallet ledger API. Every balance change goes through here (or through the commission and settlement flows,
/// which use the same backend call), and every change appends exactly one transaction.
pub struct WalletApi<B> {
    db: B,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: WalletManagement + AuditLog
{
    /// Credits an earning. Both `total_earned` and `pending_balance` go up by `amount`.
    pub async fn credit(
        &self,
        user_id: &str,
        amount: Money,
        description: &str,
        order_id: Option<i64>,
    ) -> Result<WalletBalance, LedgerError> {
        require_positive(amount)?;
        let mut entry = LedgerEntry::new(user_id, TransactionType::Earning, amount, description);
        if let Some(id) = order_id {
            entry = entry.for_order(id);
        }
        let balance = self.db.record_ledger_entry(entry).await?;
        debug!("👛️ {user_id} credited with {amount}. {balance}");
        Ok(balance)
    }

    /// Moves `amount` out of the pending balance after it has been paid out. `total_earned` is unchanged.
    ///
    /// Fails with [`LedgerError::Validation`] if the pending balance is smaller than `amount`, leaving the wallet as it
    /// was.
    pub async fn debit_pending(&self, user_id: &str, amount: Money, description: &str) -> Result<WalletBalance, LedgerError> {
        require_positive(amount)?;
        let entry = LedgerEntry::new(user_id, TransactionType::Payout, amount, description);
        let balance = self.db.record_ledger_entry(entry).await?;
        debug!("👛️ {amount} paid out to {user_id}. {balance}");
        Ok(balance)
    }

    /// A manual correction by an administrator. The transaction always stores a positive amount; a deduction
    /// applies it negatively to `total_earned`.
    pub async fn adjust(
        &self,
        user_id: &str,
        amount: Money,
        reason: &str,
        adjustment: AdjustmentType,
        performed_by: &str,
    ) -> Result<WalletBalance, LedgerError> {
        require_positive(amount)?;
        if reason.trim().is_empty() {
            return Err(LedgerError::Validation("A reason is required for wallet adjustments".into()));
        }
        let tx_type = TransactionType::from(adjustment);
        let entry = LedgerEntry::new(user_id, tx_type, amount, reason).performed_by(performed_by);
        let balance = self.db.record_ledger_entry(entry).await?;
        info!("👛️ {performed_by} applied a {tx_type} of {amount} to {user_id}: {reason}");
        let audit = NewAuditEntry::new("wallet.adjusted", performed_by, format!("wallet:{user_id}"))
            .with_metadata(json!({ "type": tx_type, "amount": amount.value(), "reason": reason }));
        record_audit(&self.db, audit).await;
        Ok(balance)
    }

    pub async fn wallet_for(&self, user_id: &str) -> Result<Option<WalletBalance>, LedgerError> {
        self.db.fetch_wallet(user_id).await
    }

    /// The user's transactions, oldest first.
    pub async fn transactions_for(&self, user_id: &str) -> Result<Vec<WalletTransaction>, LedgerError> {
        self.db.fetch_wallet_transactions(user_id).await
    }

    /// Compares the stored balances with what the transaction log and the commission records say they should be.
    pub async fn reconcile(&self, user_id: &str) -> Result<LedgerReconciliation, LedgerError> {
        let wallet = self.db.fetch_wallet(user_id).await?;
        let totals = self.db.ledger_totals(user_id).await?;
        let (total_earned, pending_balance) =
            wallet.map(|w| (w.total_earned, w.pending_balance)).unwrap_or((Money::zero(), Money::zero()));
        let result = LedgerReconciliation {
            user_id: user_id.to_string(),
            total_earned,
            pending_balance,
            signed_transactions: totals.signed_transactions,
            unpaid_commissions: totals.unpaid_commissions,
        };
        if result.is_consistent() {
            trace!("👛️ Wallet for {user_id} reconciles. {result}");
        } else {
            error!("👛️ Wallet for {user_id} does NOT reconcile. {result}");
        }
        Ok(result)
    }
}

fn require_positive(amount: Money) -> Result<(), LedgerError> {
    if amount <= Money::zero() {
        return Err(LedgerError::Validation(format!("Amount must be positive, not {amount}")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReconciliation {
    pub user_id: String,
    pub total_earned: Money,
    pub pending_balance: Money,
    pub signed_transactions: Money,
    pub unpaid_commissions: Money,
}

impl LedgerReconciliation {
    pub fn earned_matches(&self) -> bool {
        self.total_earned == self.signed_transactions
    }

    pub fn pending_matches(&self) -> bool {
        self.pending_balance == self.unpaid_commissions
    }

    pub fn is_consistent(&self) -> bool {
        self.earned_matches() && self.pending_matches()
    }
}

impl Display for LedgerReconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "earned {} (log says {}), pending {} (commissions say {})",
            self.total_earned, self.signed_transactions, self.pending_balance, self.unpaid_commissions
        )
    }
}
