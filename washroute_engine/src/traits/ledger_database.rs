use thiserror::Error;

use crate::traits::{
    AuditLog,
    CommissionManagement,
    FeeConfigManagement,
    GatewayError,
    OrderManagement,
    SettlementManagement,
    UserDirectory,
    WalletManagement,
};

/// The complete set of behaviour a storage backend needs to run every ledger API.
pub trait LedgerDatabase:
    Clone
    + OrderManagement
    + CommissionManagement
    + WalletManagement
    + SettlementManagement
    + FeeConfigManagement
    + AuditLog
    + UserDirectory
{
    /// The URL of the database
    fn url(&self) -> &str;
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid input. {0}")]
    Validation(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(String),
    #[error("The requested payout {0} does not exist")]
    PayoutNotFound(String),
    #[error("Invalid transition. {0}")]
    InvalidTransition(String),
    #[error("Order code {0} is already in use")]
    DuplicateOrderCode(String),
    #[error("The payment gateway call failed. {0}")]
    ExternalService(#[from] GatewayError),
}

impl LedgerError {
    /// True for the errors that mean "the thing you referred to is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound(_) | Self::UserNotFound(_) | Self::PayoutNotFound(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
