//! # WashRoute server
//! This crate hosts the HTTP server for the WashRoute ledger. It is responsible for:
//! * Receiving payment and transfer webhooks from the payment gateway, verifying their signatures and handing them to
//!   the engine's webhook reconciler.
//! * Running the settlement sweep, both on a timer and on demand for an external scheduler.
//! * Publishing ledger events to the notification log.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/gateway/webhook`: Payment gateway webhooks (`charge.*` and `transfer.*` events).
//! * `/jobs/settlement_sweep`: Matures held commissions and expires unpaid orders. Requires the `X-Sweep-Secret`
//!   header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod settlement_worker;

#[cfg(test)]
mod endpoint_tests;
