use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Commission, ConfirmedBy, Order},
    events::{CommissionsCreatedEvent, EventProducers},
    traits::{CommissionManagement, CommissionOutcome, LedgerError},
};

/// Runs the commission engine.
///
/// Commission creation is idempotent, so every trigger (client confirmation, admin force-confirmation, payment
/// webhook) can simply call into this API and let the backend decide whether there is anything left to do.
pub struct CommissionApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CommissionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommissionApi")
    }
}

impl<B> CommissionApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CommissionApi<B>
where B: CommissionManagement
{
    /// Creates the commission set for the order, without checking the business preconditions.
    ///
    /// Prefer [`Self::try_create_for_order`] from trigger paths.
    pub async fn create_order_commissions(
        &self,
        order_id: i64,
        confirmed_by: ConfirmedBy,
    ) -> Result<CommissionOutcome, LedgerError> {
        let outcome = self.db.create_order_commissions(order_id, confirmed_by).await?;
        match &outcome {
            CommissionOutcome::Created { created, all } => {
                info!(
                    "💸️ {} commission(s) created for order #{order_id} (confirmed by {confirmed_by}). {} in total.",
                    created.len(),
                    all.len()
                );
                let event = CommissionsCreatedEvent::new(order_id, created.clone());
                self.producers.publish_commissions_created(event).await;
            },
            CommissionOutcome::Existing(all) => {
                debug!("💸️ Order #{order_id} already has its {} commission(s). Nothing to do.", all.len());
            },
        }
        Ok(outcome)
    }

    /// Runs the commission engine if, and only if, the order is paid, confirmed and fully assigned.
    ///
    /// Returns `None` when a precondition is missing. That is expected on most trigger paths (e.g. a payment arriving
    /// before delivery), and the next trigger will try again.
    pub async fn try_create_for_order(
        &self,
        order: &Order,
        confirmed_by: ConfirmedBy,
    ) -> Result<Option<CommissionOutcome>, LedgerError> {
        if !order.is_ready_for_disbursement() {
            trace!(
                "💸️ Order {} is not ready for disbursement (paid: {}, confirmed: {}, assigned: {}).",
                order.order_code,
                order.is_paid(),
                order.is_confirmed(),
                order.is_fully_assigned()
            );
            return Ok(None);
        }
        self.create_order_commissions(order.id, confirmed_by).await.map(Some)
    }

    pub async fn commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, LedgerError> {
        self.db.fetch_commissions_for_order(order_id).await
    }

    pub async fn commissions_for_user(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError> {
        self.db.fetch_commissions_for_user(user_id).await
    }
}
