//! # Ledger events
//!
//! Order assignment, status changes, commission creation and payout resolution are published as events. Anything
//! that needs to react to them (push notifications, SMS, analytics) registers a hook in [`EventHooks`]; the ledger
//! itself never waits on the consumers.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
