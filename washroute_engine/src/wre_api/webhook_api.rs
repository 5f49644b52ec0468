use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;
use washroute_common::Secret;

use crate::{
    db_types::{ConfirmedBy, NewAuditEntry, OrderStatusType, PayoutBatchStatus},
    events::EventProducers,
    helpers::verify_signature,
    traits::{
        AuditLog,
        CommissionManagement,
        LedgerError,
        OrderManagement,
        PaymentUpdate,
        PayoutResolution,
        SettlementManagement,
        UserDirectory,
    },
    wre_api::{
        commission_api::CommissionApi,
        order_flow_api::order_target,
        record_audit,
        settlement_api::SettlementApi,
        webhook_objects::{GatewayEvent, GatewayEventKind, ReconcileOutcome, WebhookError},
    },
};

const GATEWAY_ACTOR: &str = "gateway";

/// Verifies and applies payment gateway webhooks.
///
/// Every event is handled as an idempotent command: it either moves the ledger into the state the event describes,
/// or it finds the ledger already there and does nothing. The gateway may deliver events late, twice, or out of
/// order, and the end state is the same.
///
/// * `charge.success` and `charge.failed` update the order payment. A successful charge also runs the commission
///   engine, which only does something once the order is confirmed and fully assigned.
/// * `transfer.success`, `transfer.failed` and `transfer.reversed` resolve payout batches.
pub struct WebhookApi<B> {
    db: B,
    commissions: CommissionApi<B>,
    settlement: SettlementApi<B>,
    secret: Secret<String>,
    check_signatures: bool,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi(signature checks: {})", self.check_signatures)
    }
}

impl<B: Clone> WebhookApi<B> {
    pub fn new(db: B, producers: EventProducers, secret: Secret<String>) -> Self {
        let commissions = CommissionApi::new(db.clone(), producers.clone());
        let settlement = SettlementApi::new(db.clone(), producers);
        Self { db, commissions, settlement, secret, check_signatures: true }
    }

    /// Turns off signature verification. Only for local development against a gateway simulator.
    pub fn without_signature_checks(mut self) -> Self {
        warn!("🪝️ Webhook signature checks are DISABLED. Anyone can forge payment events.");
        self.check_signatures = false;
        self
    }
}

impl<B> WebhookApi<B>
where B: OrderManagement + CommissionManagement + SettlementManagement + UserDirectory + AuditLog
{
    /// Checks the signature over the raw body, parses it, and applies the event.
    ///
    /// An event with a bad signature is rejected before anything is parsed, and leaves an audit entry behind.
    pub async fn handle_signed_event(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, WebhookError> {
        if self.check_signatures {
            if let Err(e) = verify_signature(self.secret.reveal(), body, signature) {
                warn!("🪝️ Rejected a webhook with an invalid signature: {e}");
                let entry = NewAuditEntry::new("webhook.signature_rejected", GATEWAY_ACTOR, "webhook")
                    .with_metadata(json!({ "error": e.to_string(), "body_length": body.len() }));
                record_audit(&self.db, entry).await;
                return Err(e.into());
            }
        }
        let event = serde_json::from_slice::<GatewayEvent>(body).map_err(|e| {
            warn!("🪝️ Could not parse webhook body: {e}");
            WebhookError::MalformedPayload(e.to_string())
        })?;
        Ok(self.handle_event(event).await?)
    }

    /// Applies an event that has already been authenticated.
    ///
    /// References we do not know about are discarded rather than reported as errors, so the gateway does not keep
    /// retrying something that can never succeed.
    pub async fn handle_event(&self, event: GatewayEvent) -> Result<ReconcileOutcome, LedgerError> {
        let reference = event.data.reference.trim().to_string();
        if reference.is_empty() {
            warn!("🪝️ Webhook '{}' has no reference. Discarding.", event.event);
            return Ok(ReconcileOutcome::Discarded("The event has no reference".into()));
        }
        trace!("🪝️ Handling '{}' for {reference}", event.event);
        let result = match event.kind() {
            GatewayEventKind::ChargeSuccess => self.on_charge_success(&reference, &event).await,
            GatewayEventKind::ChargeFailed => self.on_charge_failed(&reference).await,
            GatewayEventKind::TransferSuccess => self.on_transfer_success(&reference).await,
            GatewayEventKind::TransferFailed | GatewayEventKind::TransferReversed => {
                let reason = event.data.reason.clone().unwrap_or_else(|| event.event.clone());
                self.on_transfer_failed(&reference, &reason).await
            },
            GatewayEventKind::Unknown => {
                debug!("🪝️ Ignoring webhook event type '{}'", event.event);
                Ok(ReconcileOutcome::Discarded(format!("Event type '{}' is not handled", event.event)))
            },
        };
        match result {
            Ok(outcome) => {
                debug!("🪝️ '{}' for {reference}: {outcome}", event.event);
                Ok(outcome)
            },
            Err(e) if e.is_not_found() => {
                warn!("🪝️ '{}' refers to something we do not have ({e}). Discarding.", event.event);
                Ok(ReconcileOutcome::Discarded(e.to_string()))
            },
            Err(e) => {
                error!("🪝️ Could not apply '{}' for {reference}: {e}", event.event);
                Err(e)
            },
        }
    }

    async fn on_charge_success(&self, reference: &str, event: &GatewayEvent) -> Result<ReconcileOutcome, LedgerError> {
        let order = self
            .db
            .fetch_order_by_payment_reference(reference)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(format!("with payment reference {reference}")))?;
        if let Some(amount) = event.data.amount {
            if amount < order.pricing.total_amount {
                warn!(
                    "🪝️ Charge {reference} paid {amount} but order {} costs {}. Not marking it as paid.",
                    order.order_code, order.pricing.total_amount
                );
                let entry = NewAuditEntry::new("webhook.underpayment", GATEWAY_ACTOR, order_target(&order))
                    .with_metadata(json!({ "paid": amount.value(), "due": order.pricing.total_amount.value() }));
                record_audit(&self.db, entry).await;
                return Ok(ReconcileOutcome::Discarded(format!("Amount {amount} is less than the order total")));
            }
        }
        let paid_at = event.data.paid_at.unwrap_or_else(Utc::now);
        let (order, outcome) = match self.db.mark_payment_success(reference, paid_at).await? {
            PaymentUpdate::Applied(order) => {
                info!("🪝️ Order {} is paid ({} via {})", order.order_code, order.pricing.total_amount, channel(event));
                let outcome = ReconcileOutcome::Applied(format!("Order {} marked as paid", order.order_code));
                (order, outcome)
            },
            PaymentUpdate::Unchanged(order) => {
                let outcome = ReconcileOutcome::AlreadyApplied(format!("Order {} was already paid", order.order_code));
                (order, outcome)
            },
            PaymentUpdate::NotFound => {
                return Err(LedgerError::OrderNotFound(format!("with payment reference {reference}")));
            },
        };
        if order.status == OrderStatusType::Cancelled {
            warn!(
                "🪝️ Payment arrived for cancelled order {}. It needs a manual refund or reinstatement.",
                order.order_code
            );
            let entry = NewAuditEntry::new("webhook.paid_after_cancel", GATEWAY_ACTOR, order_target(&order));
            record_audit(&self.db, entry).await;
            return Ok(outcome);
        }
        // A replay also gets here, which picks up a commission run that an earlier delivery did not finish.
        self.commissions.try_create_for_order(&order, ConfirmedBy::System).await?;
        Ok(outcome)
    }

    async fn on_charge_failed(&self, reference: &str) -> Result<ReconcileOutcome, LedgerError> {
        match self.db.mark_payment_failed(reference).await? {
            PaymentUpdate::Applied(order) => {
                info!("🪝️ Payment for order {} failed", order.order_code);
                Ok(ReconcileOutcome::Applied(format!("Payment for order {} marked as failed", order.order_code)))
            },
            PaymentUpdate::Unchanged(order) => {
                if order.is_paid() {
                    warn!("🪝️ Ignoring a charge failure for order {}, which is already paid", order.order_code);
                }
                Ok(ReconcileOutcome::AlreadyApplied(format!(
                    "Payment for order {} is already {}",
                    order.order_code, order.payment_status
                )))
            },
            PaymentUpdate::NotFound => Err(LedgerError::OrderNotFound(format!("with payment reference {reference}"))),
        }
    }

    async fn on_transfer_success(&self, reference: &str) -> Result<ReconcileOutcome, LedgerError> {
        match self.settlement.complete_payout(reference, GATEWAY_ACTOR).await? {
            PayoutResolution::Resolved { payout, .. } => {
                Ok(ReconcileOutcome::Applied(format!("Payout {} is paid", payout.reference)))
            },
            PayoutResolution::AlreadyResolved(payout) if payout.status == PayoutBatchStatus::Paid => {
                Ok(ReconcileOutcome::AlreadyApplied(format!("Payout {} was already paid", payout.reference)))
            },
            PayoutResolution::AlreadyResolved(payout) => {
                error!(
                    "🪝️ Transfer success for payout {}, which is already {}. This needs manual reconciliation.",
                    payout.reference, payout.status
                );
                Ok(ReconcileOutcome::Discarded(format!("Payout {} is already {}", payout.reference, payout.status)))
            },
        }
    }

    async fn on_transfer_failed(&self, reference: &str, reason: &str) -> Result<ReconcileOutcome, LedgerError> {
        match self.settlement.fail_payout(reference, reason, GATEWAY_ACTOR).await? {
            PayoutResolution::Resolved { payout, .. } => {
                Ok(ReconcileOutcome::Applied(format!("Payout {} failed: {reason}", payout.reference)))
            },
            PayoutResolution::AlreadyResolved(payout) if payout.status == PayoutBatchStatus::Failed => {
                Ok(ReconcileOutcome::AlreadyApplied(format!("Payout {} had already failed", payout.reference)))
            },
            PayoutResolution::AlreadyResolved(payout) => {
                error!(
                    "🪝️ Transfer failure or reversal ({reason}) for payout {}, which is already {}. This needs manual \
                     reconciliation.",
                    payout.reference, payout.status
                );
                Ok(ReconcileOutcome::Discarded(format!("Payout {} is already {}", payout.reference, payout.status)))
            },
        }
    }
}

fn channel(event: &GatewayEvent) -> &str {
    event.data.channel.as_deref().unwrap_or("unknown channel")
}
