use serde::{Deserialize, Serialize};

use crate::db_types::{Commission, Order, OrderStatusType, Payout};

/// Emitted when a rider and partner have been attached to an order. Both parties should be told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAssignedEvent {
    pub order: Order,
}

impl OrderAssignedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    /// The user ids that should be notified.
    pub fn recipients(&self) -> Vec<&str> {
        [self.order.rider_id.as_deref(), self.order.partner_id.as_deref()].into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionsCreatedEvent {
    pub order_id: i64,
    /// Only the commissions created by this invocation.
    pub commissions: Vec<Commission>,
}

impl CommissionsCreatedEvent {
    pub fn new(order_id: i64, commissions: Vec<Commission>) -> Self {
        Self { order_id, commissions }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResolvedEvent {
    pub payout: Payout,
}

impl PayoutResolvedEvent {
    pub fn new(payout: Payout) -> Self {
        Self { payout }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventType {
    OrderAssigned(OrderAssignedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    CommissionsCreated(CommissionsCreatedEvent),
    PayoutResolved(PayoutResolvedEvent),
}
