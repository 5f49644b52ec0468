//! # WashRoute engine public API
//!
//! The `wre_api` module exposes the programmatic API of the ledger. The API is modular, so that clients can pick the
//! parts they need. The webhook endpoint only needs a [`webhook_api::WebhookApi`], the settlement worker only needs a
//! [`settlement_api::SettlementApi`], and so on.
//!
//! * [`order_flow_api`] covers checkout, assignment, status progression, cancellation, confirmation and expiry of
//!   unpaid orders.
//! * [`commission_api`] runs the commission engine for an order.
//! * [`wallet_api`] credits, debits and adjusts wallets, and reconciles balances against the transaction log.
//! * [`settlement_api`] matures commissions and drives payouts through the payment gateway.
//! * [`webhook_api`] verifies and applies payment gateway events.
//! * [`fee_config_api`] maintains the fee schedule that new orders are priced with.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements the backend traits it needs, plus the event producers
//! it should publish to.
//!
//! ```rust,ignore
//! use washroute_engine::{events::EventProducers, SettlementApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/washroute.db", 5).await?;
//! let api = SettlementApi::new(db, EventProducers::default());
//! let result = api.run_settlement_sweep(Utc::now(), Duration::hours(24)).await?;
//! ```
use log::*;

use crate::{db_types::NewAuditEntry, traits::AuditLog};

pub mod commission_api;
pub mod fee_config_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod settlement_api;
pub mod wallet_api;
pub mod webhook_api;
pub mod webhook_objects;

/// Writes an audit entry. The audit sink is write-only from the ledger's point of view, so a failure here is logged
/// and never undoes the action being audited.
pub(crate) async fn record_audit<B: AuditLog>(db: &B, entry: NewAuditEntry) {
    let action = entry.action.clone();
    let target = entry.target_entity.clone();
    if let Err(e) = db.append_audit_entry(entry).await {
        error!("📝️ Could not write audit entry '{action}' for {target}: {e}");
    }
}
