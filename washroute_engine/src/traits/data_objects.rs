use serde::{Deserialize, Serialize};
use washroute_common::Money;

use crate::db_types::{Commission, Order, Payout};

/// Result of a commission creation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommissionOutcome {
    /// At least one new commission was stored. `created` holds the new records, `all` the complete set for the order.
    Created { created: Vec<Commission>, all: Vec<Commission> },
    /// Nothing new was stored. This is the idempotent no-op path, not an error.
    Existing(Vec<Commission>),
}

impl CommissionOutcome {
    /// Every commission stored for the order after the call.
    pub fn commissions(&self) -> &[Commission] {
        match self {
            Self::Created { all, .. } => all,
            Self::Existing(all) => all,
        }
    }

    /// Only the commissions this call stored.
    pub fn created(&self) -> &[Commission] {
        match self {
            Self::Created { created, .. } => created,
            Self::Existing(_) => &[],
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Result of a conditional payment-status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentUpdate {
    Applied(Order),
    /// The payment was already in the target state (or a state the update may not overwrite).
    Unchanged(Order),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutResolution {
    Resolved { payout: Payout, commissions: Vec<Commission> },
    AlreadyResolved(Payout),
}

impl PayoutResolution {
    pub fn payout(&self) -> &Payout {
        match self {
            Self::Resolved { payout, .. } => payout,
            Self::AlreadyResolved(payout) => payout,
        }
    }

    pub fn is_resolved_now(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Balances recomputed from the underlying records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Σ transaction amounts signed by type.
    pub signed_transactions: Money,
    /// Σ commissions not yet `paid`.
    pub unpaid_commissions: Money,
}
