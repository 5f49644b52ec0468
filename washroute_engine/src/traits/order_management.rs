use chrono::{DateTime, Utc};

use crate::{
    db_types::{ConfirmedBy, Order, OrderCode, OrderInsert, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::{data_objects::PaymentUpdate, LedgerError},
};

/// Storage for orders and their state transitions.
///
/// Every mutating method here is a conditional update. Methods returning `Option<Order>` return `None` when the
/// precondition (the "expected" state) did not hold at the moment of the write. The caller decides whether that is an
/// error or an idempotent no-op.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Persists a priced order in `created` status with a `pending` payment.
    async fn insert_order(&self, order: OrderInsert) -> Result<Order, LedgerError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, LedgerError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError>;

    /// Attaches the rider and partner and sets the status to `assigned`. Only succeeds from `created`.
    async fn assign_order(&self, id: i64, rider_id: &str, partner_id: &str) -> Result<Option<Order>, LedgerError>;

    /// Compare-and-swap on the status: only writes `new_status` if the stored status is still `expected`.
    async fn update_order_status(
        &self,
        id: i64,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, LedgerError>;

    /// Sets the confirmation flag(s) for a delivered order.
    async fn confirm_order(&self, id: i64, confirmed_by: ConfirmedBy) -> Result<Option<Order>, LedgerError>;

    /// Marks the payment for `reference` as successful.
    async fn mark_payment_success(&self, reference: &str, paid_at: DateTime<Utc>)
        -> Result<PaymentUpdate, LedgerError>;

    /// Marks the payment for `reference` as failed, unless it has already succeeded.
    async fn mark_payment_failed(&self, reference: &str) -> Result<PaymentUpdate, LedgerError>;

    /// Cancels orders still awaiting payment that were created at or before `cutoff`.
    async fn expire_unpaid_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, LedgerError>;
}
