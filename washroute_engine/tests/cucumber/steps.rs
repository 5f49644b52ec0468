use chrono::{Duration, Utc};
use cucumber::{then, when};
use washroute_engine::{
    db_types::{ClientSnapshot, DeliveryLocation, Money, NewOrder, OrderItem, OrderStatusType, PayoutBatchStatus},
    CommissionManagement,
    GatewayEvent,
    ReconcileOutcome,
};

use crate::{
    cucumber::LedgerWorld,
    support::{charging_gateway, transferring_gateway, ADMIN},
};

const HOLD_HOURS: i64 = 24;

fn parse_money(s: &str) -> Money {
    s.parse::<Money>().unwrap_or_else(|e| panic!("Not a valid amount: {s}. {e}"))
}

fn parse_status(s: &str) -> OrderStatusType {
    s.parse::<OrderStatusType>().unwrap_or_else(|e| panic!("{e}"))
}

/// Parses "2 x 15.00 and 1 x 20.00" into line items.
fn parse_items(s: &str) -> Vec<OrderItem> {
    s.split(" and ")
        .enumerate()
        .map(|(i, line)| {
            let (qty, price) = line.split_once(" x ").unwrap_or_else(|| panic!("Not a valid line item: {line}"));
            let qty = qty.trim().parse::<i64>().expect("Not a valid quantity");
            OrderItem::new(format!("Item {}", i + 1), parse_money(price), qty)
        })
        .collect()
}

#[when(expr = "client '{word}' checks out order '{word}' with {string}")]
async fn check_out(world: &mut LedgerWorld, client_id: String, label: String, items: String) {
    let client = ClientSnapshot {
        phone: "+233200000000".into(),
        display_name: client_id.clone(),
        location: DeliveryLocation { address: "1 Ring Road, Accra".into(), latitude: 5.6, longitude: -0.19 },
    };
    let order = NewOrder::new(client_id, client, parse_items(&items));
    let result = world.system().orders.checkout(order, &charging_gateway()).await.expect("Error checking out");
    world.system_mut().order_labels.insert(label, result.order);
}

#[when(expr = "the gateway reports payment for order '{word}'")]
async fn report_payment(world: &mut LedgerWorld, label: String) {
    let order = world.order(&label).await;
    let event = GatewayEvent::new("charge.success", order.payment_reference.as_str())
        .with_amount(order.pricing.total_amount)
        .with_paid_at(Utc::now());
    let outcome = world.system().webhooks.handle_event(event).await.expect("Error handling webhook");
    assert!(!matches!(outcome, ReconcileOutcome::Discarded(_)), "Payment was discarded: {outcome}");
}

#[when(expr = "order '{word}' is assigned to rider '{word}' and partner '{word}'")]
async fn assign(world: &mut LedgerWorld, label: String, rider: String, partner: String) {
    let order = world.order(&label).await;
    world.system().orders.assign_order(order.id, &rider, &partner, ADMIN).await.expect("Error assigning order");
}

#[when(expr = "order '{word}' moves to {word}")]
async fn advance(world: &mut LedgerWorld, label: String, status: String) {
    let order = world.order(&label).await;
    let status = parse_status(&status);
    world.system().orders.advance_status(order.id, status, ADMIN).await.expect("Error advancing order");
}

#[when(expr = "I try to move order '{word}' to {word}")]
async fn try_advance(world: &mut LedgerWorld, label: String, status: String) {
    let order = world.order(&label).await;
    let status = parse_status(&status);
    let result = world.system().orders.advance_status(order.id, status, ADMIN).await;
    world.system_mut().last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "client '{word}' confirms delivery of order '{word}'")]
async fn client_confirms(world: &mut LedgerWorld, client_id: String, label: String) {
    let order = world.order(&label).await;
    world.system().orders.confirm_delivery(order.id, &client_id).await.expect("Error confirming delivery");
}

#[when(expr = "an admin force-confirms order '{word}'")]
async fn admin_confirms(world: &mut LedgerWorld, label: String) {
    let order = world.order(&label).await;
    world.system().orders.force_confirm(order.id, ADMIN).await.expect("Error confirming order");
}

#[when(expr = "the settlement sweep runs {int} hours later")]
async fn sweep(world: &mut LedgerWorld, hours: i64) {
    let now = Utc::now() + Duration::hours(hours);
    let result =
        world.system().settlement.run_settlement_sweep(now, Duration::hours(HOLD_HOURS)).await.expect("Sweep failed");
    world.system_mut().last_matured = result.matured_count();
}

#[when(expr = "an admin pays out {word} to '{word}'")]
async fn pay_out(world: &mut LedgerWorld, amount: String, user: String) {
    let amount = parse_money(&amount);
    let result = world.system().settlement.initiate_payout(&user, amount, ADMIN, &transferring_gateway()).await;
    let sys = world.system_mut();
    match result {
        Ok(payout) => {
            sys.last_payout = Some(payout);
            sys.last_error = None;
        },
        Err(e) => sys.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the gateway reports the transfer {word}")]
async fn report_transfer(world: &mut LedgerWorld, result: String) {
    let reference = world.system().last_payout.as_ref().expect("No payout has been made").reference.clone();
    let event = match result.as_str() {
        "succeeded" => GatewayEvent::new("transfer.success", reference),
        "failed" => GatewayEvent::new("transfer.failed", reference).with_reason("Account closed"),
        "reversed" => GatewayEvent::new("transfer.reversed", reference),
        other => panic!("Unknown transfer result: {other}"),
    };
    world.system().webhooks.handle_event(event).await.expect("Error handling webhook");
}

#[then(expr = "order '{word}' costs {word}")]
async fn check_total(world: &mut LedgerWorld, label: String, total: String) {
    let order = world.order(&label).await;
    assert_eq!(order.pricing.total_amount, parse_money(&total), "Order total is incorrect");
}

#[then(expr = "order '{word}' is {word}")]
async fn check_status(world: &mut LedgerWorld, label: String, status: String) {
    let order = world.order(&label).await;
    assert_eq!(order.status, parse_status(&status), "Order status is incorrect");
}

#[then(expr = "the last action failed with {string}")]
async fn check_last_error(world: &mut LedgerWorld, expected: String) {
    let err = world.system().last_error.clone().expect("The last action did not fail");
    assert!(err.contains(&expected), "Expected an error containing '{expected}', got '{err}'");
}

#[then(expr = "order '{word}' has {int} commissions")]
async fn check_commission_count(world: &mut LedgerWorld, label: String, count: usize) {
    let order = world.order(&label).await;
    let commissions = world.system().db.fetch_commissions_for_order(order.id).await.expect("Error fetching commissions");
    assert_eq!(commissions.len(), count, "Commission count is incorrect");
}

#[then(expr = "{int} commissions matured")]
async fn check_matured(world: &mut LedgerWorld, count: usize) {
    assert_eq!(world.system().last_matured, count, "Matured commission count is incorrect");
}

#[then(expr = "the wallet for '{word}' shows {word} earned and {word} pending")]
async fn check_wallet(world: &mut LedgerWorld, user: String, earned: String, pending: String) {
    let wallet = world.system().wallets.wallet_for(&user).await.expect("Error fetching wallet").expect("No wallet");
    assert_eq!(wallet.total_earned, parse_money(&earned), "Total earned is incorrect");
    assert_eq!(wallet.pending_balance, parse_money(&pending), "Pending balance is incorrect");
}

#[then(expr = "the wallet for '{word}' reconciles")]
async fn check_reconciles(world: &mut LedgerWorld, user: String) {
    let reconciliation = world.system().wallets.reconcile(&user).await.expect("Error reconciling wallet");
    assert!(reconciliation.is_consistent(), "Wallet does not reconcile: {reconciliation}");
}

#[then(expr = "'{word}' has {word} available for payout")]
async fn check_available(world: &mut LedgerWorld, user: String, amount: String) {
    let available = world.system().settlement.payout_eligible_total(&user).await.expect("Error fetching balance");
    assert_eq!(available, parse_money(&amount), "Available payout balance is incorrect");
}

#[then(expr = "the payout is {word}")]
async fn check_payout(world: &mut LedgerWorld, status: String) {
    let reference = world.system().last_payout.as_ref().expect("No payout has been made").reference.clone();
    let payout =
        world.system().settlement.payout(&reference).await.expect("Error fetching payout").expect("Payout is missing");
    let expected = match status.as_str() {
        "processing" => PayoutBatchStatus::Processing,
        "paid" => PayoutBatchStatus::Paid,
        "failed" => PayoutBatchStatus::Failed,
        other => panic!("Unknown payout status: {other}"),
    };
    assert_eq!(payout.status, expected, "Payout status is incorrect");
}
