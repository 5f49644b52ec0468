//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide to run the ledger. The public APIs in
//! `wre_api` are generic over these traits, so a backend only needs to implement the traits for the APIs it serves.
//!
//! * [`OrderManagement`] stores orders and performs the conditional order transitions (assignment, status, payment,
//!   confirmation, expiry).
//! * [`CommissionManagement`] creates the commission set for an order, atomically with the wallet credits.
//! * [`WalletManagement`] applies ledger entries and answers balance queries.
//! * [`SettlementManagement`] matures commissions and drives payout batches.
//! * [`FeeConfigManagement`] keeps the fee schedule history.
//! * [`AuditLog`] is the append-only audit sink.
//! * [`UserDirectory`] resolves riders, partners and their payout details.
//!
//! [`LedgerDatabase`] ties them all together. [`PaymentGateway`] is the outbound contract for the external payment
//! provider, and is deliberately not a storage trait.
mod audit_log;
mod commission_management;
mod data_objects;
mod fee_config;
mod ledger_database;
mod order_management;
mod payment_gateway;
mod settlement_management;
mod user_directory;
mod wallet_management;

pub use audit_log::AuditLog;
pub use commission_management::CommissionManagement;
pub use data_objects::{CommissionOutcome, LedgerTotals, PaymentUpdate, PayoutResolution};
pub use fee_config::FeeConfigManagement;
pub use ledger_database::{LedgerDatabase, LedgerError};
pub use order_management::OrderManagement;
pub use payment_gateway::{
    ChargeAuthorization,
    ChargeRequest,
    GatewayError,
    PaymentGateway,
    TransferReceipt,
    TransferRequest,
    VerifiedRecipient,
};
pub use settlement_management::SettlementManagement;
pub use user_directory::UserDirectory;
pub use wallet_management::WalletManagement;
