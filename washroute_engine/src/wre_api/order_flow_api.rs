use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde_json::json;
use washroute_common::Money;

use crate::{
    db_types::{
        ConfirmedBy,
        NewAuditEntry,
        NewOrder,
        Order,
        OrderCode,
        OrderInsert,
        OrderStatusType,
        PricingBreakdown,
        UserRole,
    },
    events::{EventProducers, OrderAssignedEvent, OrderStatusChangedEvent},
    helpers::{new_order_code, new_payment_reference},
    traits::{
        AuditLog,
        ChargeRequest,
        CommissionManagement,
        FeeConfigManagement,
        LedgerError,
        OrderManagement,
        PaymentGateway,
        UserDirectory,
    },
    wre_api::{
        commission_api::CommissionApi,
        fee_config_api::current_schedule_or_default,
        order_objects::{CheckoutResult, ConfirmationResult, OrderQueryFilter},
        record_audit,
    },
};

/// How many fresh order codes checkout tries before giving up.
const MAX_ORDER_CODE_ATTEMPTS: usize = 5;

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, assignment, status progression,
/// cancellation, and the confirmations that release the commissions.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    commissions: CommissionApi<B>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let commissions = CommissionApi::new(db.clone(), producers.clone());
        Self { db, producers, commissions }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + CommissionManagement + FeeConfigManagement + AuditLog + UserDirectory
{
    /// Prices a new order against the current fee schedule, opens a charge with the payment gateway, and stores the
    /// order in `created` status with a `pending` payment.
    ///
    /// If the gateway call fails, no order is stored and the caller may simply try again.
    pub async fn checkout<G: PaymentGateway>(&self, order: NewOrder, gateway: &G) -> Result<CheckoutResult, LedgerError> {
        order.validate().map_err(LedgerError::Validation)?;
        let fees = current_schedule_or_default(&self.db).await?;
        let pricing = PricingBreakdown::calculate(&order.items, &fees).map_err(LedgerError::Validation)?;
        if pricing.total_amount <= Money::zero() {
            return Err(LedgerError::Validation(format!("The order total must be positive, not {}", pricing.total_amount)));
        }
        let reference = new_payment_reference();
        let request = ChargeRequest {
            amount: pricing.total_amount,
            currency: order.currency.clone(),
            reference: reference.clone(),
            metadata: json!({ "client_id": order.client_id, "item_count": order.items.len() }),
        };
        trace!("🛒️ Opening a charge of {} {} for client {}", pricing.total_amount, order.currency, order.client_id);
        let authorization = gateway.initialize_charge(request).await.map_err(|e| {
            warn!("🛒️ Could not open a charge for client {}: {e}", order.client_id);
            e
        })?;
        if authorization.reference != reference {
            warn!(
                "🛒️ The gateway replaced our payment reference {reference} with {}. Using the gateway's reference.",
                authorization.reference
            );
        }
        for attempt in 1..=MAX_ORDER_CODE_ATTEMPTS {
            let insert = OrderInsert {
                order_code: new_order_code(),
                order: order.clone(),
                pricing,
                fees,
                payment_reference: authorization.reference.clone(),
                created_at: Utc::now(),
            };
            match self.db.insert_order(insert).await {
                Ok(order) => {
                    info!("🛒️ New order {order}");
                    return Ok(CheckoutResult { order, authorization_url: authorization.authorization_url });
                },
                Err(LedgerError::DuplicateOrderCode(code)) => {
                    warn!("🛒️ Order code {code} is taken (attempt {attempt}/{MAX_ORDER_CODE_ATTEMPTS}).");
                },
                Err(e) => return Err(e),
            }
        }
        error!("🛒️ Could not allocate a unique order code after {MAX_ORDER_CODE_ATTEMPTS} attempts.");
        Err(LedgerError::DatabaseError("Could not allocate a unique order code".into()))
    }

    pub async fn order_by_id(&self, id: i64) -> Result<Option<Order>, LedgerError> {
        self.db.fetch_order_by_id(id).await
    }

    pub async fn order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, LedgerError> {
        self.db.fetch_order_by_code(code).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        trace!("🛒️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    async fn fetch_order(&self, id: i64) -> Result<Order, LedgerError> {
        self.db.fetch_order_by_id(id).await?.ok_or_else(|| LedgerError::OrderNotFound(format!("#{id}")))
    }

    /// Checks that `user_id` is an active user with the given role.
    async fn require_active(&self, user_id: &str, role: UserRole) -> Result<(), LedgerError> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::Validation(format!("A {role} id is required")));
        }
        let user =
            self.db.fetch_directory_user(user_id).await?.ok_or_else(|| LedgerError::UserNotFound(user_id.into()))?;
        if user.role != role || !user.is_active {
            return Err(LedgerError::Validation(format!("User {user_id} is not an active {role}")));
        }
        Ok(())
    }

    /// Attaches a rider and a partner to an order and moves it to `assigned`.
    ///
    /// Both parties must be active users of the right role, and the order must still be in `created`.
    pub async fn assign_order(
        &self,
        id: i64,
        rider_id: &str,
        partner_id: &str,
        performed_by: &str,
    ) -> Result<Order, LedgerError> {
        self.require_active(rider_id, UserRole::Rider).await?;
        self.require_active(partner_id, UserRole::Partner).await?;
        let order = self.fetch_order(id).await?;
        if order.status != OrderStatusType::Created {
            return Err(LedgerError::InvalidTransition(format!(
                "Order {} cannot be assigned because it is {}",
                order.order_code, order.status
            )));
        }
        let assigned = self.db.assign_order(id, rider_id, partner_id).await?.ok_or_else(|| {
            LedgerError::InvalidTransition(format!("Order {} changed while it was being assigned", order.order_code))
        })?;
        info!("🛒️ Order {} assigned to rider {rider_id} and partner {partner_id}", assigned.order_code);
        let entry = NewAuditEntry::new("order.assigned", performed_by, order_target(&assigned))
            .with_metadata(json!({ "rider_id": rider_id, "partner_id": partner_id }));
        record_audit(&self.db, entry).await;
        self.producers.publish_order_assigned(OrderAssignedEvent::new(assigned.clone())).await;
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order.status, assigned.clone())).await;
        Ok(assigned)
    }

    /// Moves an order forward to `new_status`.
    ///
    /// The new status must have a strictly higher priority than the current one. Skipping states is allowed;
    /// regressing or repeating a state is an [`LedgerError::InvalidTransition`]. `assigned` and `cancelled` have
    /// their own entry points ([`Self::assign_order`] and [`Self::cancel_order`]).
    ///
    /// Concurrent updates are linearised by a compare-and-swap on the status, so of two racing requests that would
    /// conflict, only one succeeds.
    pub async fn advance_status(
        &self,
        id: i64,
        new_status: OrderStatusType,
        performed_by: &str,
    ) -> Result<Order, LedgerError> {
        match new_status {
            OrderStatusType::Assigned => {
                return Err(LedgerError::Validation("Use order assignment to set the assigned status".into()))
            },
            OrderStatusType::Cancelled => {
                return Err(LedgerError::Validation("Use order cancellation to cancel an order".into()))
            },
            _ => {},
        }
        let order = self.fetch_order(id).await?;
        if !order.status.can_advance_to(new_status) {
            return Err(LedgerError::InvalidTransition(format!(
                "Order {} cannot move from {} to {new_status}",
                order.order_code, order.status
            )));
        }
        let updated = self.db.update_order_status(id, order.status, new_status).await?.ok_or_else(|| {
            LedgerError::InvalidTransition(format!(
                "Order {} is no longer {}. Someone else changed it first.",
                order.order_code, order.status
            ))
        })?;
        debug!("🛒️ Order {} moved from {} to {new_status}", updated.order_code, order.status);
        let entry = NewAuditEntry::new("order.status_changed", performed_by, order_target(&updated))
            .with_metadata(json!({ "from": order.status, "to": new_status }));
        record_audit(&self.db, entry).await;
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order.status, updated.clone())).await;
        Ok(updated)
    }

    /// Cancels an order. Only possible while the order is `created` or `assigned`; after that the rider or partner
    /// has physically engaged, and unwinding the order is a manual process.
    pub async fn cancel_order(&self, id: i64, performed_by: &str, reason: &str) -> Result<Order, LedgerError> {
        let order = self.fetch_order(id).await?;
        if !order.status.is_cancellable() {
            return Err(LedgerError::InvalidTransition(format!(
                "Order {} cannot be cancelled because it is {}",
                order.order_code, order.status
            )));
        }
        let cancelled = self.db.update_order_status(id, order.status, OrderStatusType::Cancelled).await?.ok_or_else(
            || LedgerError::InvalidTransition(format!("Order {} changed while it was being cancelled", order.order_code)),
        )?;
        info!("🛒️ Order {} cancelled by {performed_by}: {reason}", cancelled.order_code);
        let entry = NewAuditEntry::new("order.cancelled", performed_by, order_target(&cancelled))
            .with_metadata(json!({ "from": order.status, "reason": reason }));
        record_audit(&self.db, entry).await;
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order.status, cancelled.clone())).await;
        Ok(cancelled)
    }

    /// Administrative confirmation of a delivered order. Sets both confirmation flags and runs the commission engine
    /// if the order is paid and fully assigned.
    ///
    /// Safe to call concurrently or repeatedly: the commission set is only ever created once.
    pub async fn force_confirm(&self, id: i64, performed_by: &str) -> Result<ConfirmationResult, LedgerError> {
        let order = self.confirm(id, ConfirmedBy::Admin).await?;
        info!("🛒️ Order {} force-confirmed by {performed_by}", order.order_code);
        let entry = NewAuditEntry::new("order.force_confirmed", performed_by, order_target(&order));
        record_audit(&self.db, entry).await;
        let commissions = self.commissions.try_create_for_order(&order, ConfirmedBy::Admin).await?;
        Ok(ConfirmationResult { order, commissions })
    }

    /// The client's own confirmation that a delivered order arrived. Only the client who placed the order may confirm.
    pub async fn confirm_delivery(&self, id: i64, client_id: &str) -> Result<ConfirmationResult, LedgerError> {
        let order = self.fetch_order(id).await?;
        if order.client_id != client_id {
            return Err(LedgerError::Validation(format!(
                "Order {} can only be confirmed by the client who placed it",
                order.order_code
            )));
        }
        let order = self.confirm(id, ConfirmedBy::Client).await?;
        debug!("🛒️ Client {client_id} confirmed delivery of order {}", order.order_code);
        let commissions = self.commissions.try_create_for_order(&order, ConfirmedBy::Client).await?;
        Ok(ConfirmationResult { order, commissions })
    }

    async fn confirm(&self, id: i64, confirmed_by: ConfirmedBy) -> Result<Order, LedgerError> {
        let order = self.fetch_order(id).await?;
        let not_delivered = || {
            LedgerError::InvalidTransition(format!("Order {} must be delivered first", order.order_code))
        };
        if order.status != OrderStatusType::Delivered {
            return Err(not_delivered());
        }
        self.db.confirm_order(id, confirmed_by).await?.ok_or_else(not_delivered)
    }

    /// Cancels unpaid orders (payment pending or failed) older than `limit`, and marks their payment as abandoned.
    pub async fn expire_unpaid_orders(&self, limit: Duration) -> Result<Vec<Order>, LedgerError> {
        let cutoff = Utc::now()
            .checked_sub_signed(limit)
            .ok_or_else(|| LedgerError::Validation(format!("An unpaid order timeout of {limit} is out of range")))?;
        let expired = self.db.expire_unpaid_orders(cutoff).await?;
        if !expired.is_empty() {
            info!("🛒️ {} unpaid order(s) created before {cutoff} have been cancelled", expired.len());
        }
        for order in &expired {
            let entry = NewAuditEntry::new("order.expired", "system", order_target(order))
                .with_metadata(json!({ "payment_reference": order.payment_reference }));
            record_audit(&self.db, entry).await;
        }
        Ok(expired)
    }
}

pub(crate) fn order_target(order: &Order) -> String {
    format!("order:{}", order.order_code.as_str())
}
