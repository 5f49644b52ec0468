//! WashRoute Engine
//!
//! The WashRoute engine is the ledger behind the WashRoute laundry delivery marketplace. A client pays up front for an
//! order, a partner laundry washes it and a rider carries it both ways. The engine tracks the order through its
//! lifecycle, splits the payment between the platform, the rider and the partner, keeps a wallet ledger for every
//! beneficiary, and settles their earnings through the payment gateway.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend). The backend traits describe everything the ledger needs from a
//!    durable store. You should never need to call the store directly; use the public API instead. The exception is
//!    the data types, which are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@wre_api`]): order flow, commissions, wallets, settlement, gateway webhooks and fee
//!    configuration. Each API is generic over the backend traits it needs.
//! 3. Events ([`mod@events`]). Order assignment, status changes, commission creation and payout resolution are
//!    published to hooks that you can register to send notifications or feed other systems.
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod wre_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AuditLog,
    CommissionManagement,
    CommissionOutcome,
    FeeConfigManagement,
    GatewayError,
    LedgerDatabase,
    LedgerError,
    OrderManagement,
    PaymentGateway,
    PaymentUpdate,
    PayoutResolution,
    SettlementManagement,
    UserDirectory,
    WalletManagement,
};
pub use wre_api::{
    commission_api::CommissionApi,
    fee_config_api::FeeConfigApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    settlement_api::{SettlementApi, SweepResult},
    wallet_api::{LedgerReconciliation, WalletApi},
    webhook_api::WebhookApi,
    webhook_objects::{GatewayEvent, GatewayEventKind, ReconcileOutcome, WebhookError},
};
