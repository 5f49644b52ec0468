//! Event hooks for the server.
//!
//! Delivery of push and SMS messages happens outside this server. The hooks here hand every event to the
//! `wrs::notifications` log target as a JSON line, which is what the delivery service tails.
use log::*;
use serde::Serialize;
use washroute_engine::events::{EventHandlers, EventHooks};

const NOTIFICATION_BUFFER_SIZE: usize = 25;

pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_assigned(|ev| {
            for recipient in ev.recipients() {
                emit("order_assigned", recipient, &ev.order);
            }
            Box::pin(async {})
        })
        .on_status_changed(|ev| {
            debug!("📣️ Order {} moved from {} to {}", ev.order.order_code, ev.old_status, ev.order.status);
            emit("order_status_changed", &ev.order.client_id, &ev);
            Box::pin(async {})
        })
        .on_commissions_created(|ev| {
            // Platform commissions have no beneficiary to notify
            for commission in &ev.commissions {
                if let Some(recipient) = commission.beneficiary_id.as_deref() {
                    emit("commission_created", recipient, commission);
                }
            }
            Box::pin(async {})
        })
        .on_payout_resolved(|ev| {
            emit("payout_resolved", &ev.payout.user_id, &ev.payout);
            Box::pin(async {})
        });
    EventHandlers::new(NOTIFICATION_BUFFER_SIZE, hooks)
}

fn emit<T: Serialize>(kind: &str, recipient: &str, payload: &T) {
    match serde_json::to_string(payload) {
        Ok(json) => info!(target: "wrs::notifications", "{{\"kind\":\"{kind}\",\"recipient\":\"{recipient}\",\"payload\":{json}}}"),
        Err(e) => error!("📣️ Could not serialize the {kind} notification for {recipient}. {e}"),
    }
}
