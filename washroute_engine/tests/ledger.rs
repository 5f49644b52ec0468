use washroute_engine::{
    db_types::{AdjustmentType, Money, TransactionType},
    AuditLog,
    LedgerError,
    WalletApi,
};

use crate::support::*;

mod support;

#[tokio::test]
async fn adjustments_change_earnings_but_not_pending() {
    let db = setup().await;
    seed(&db).await;
    let order = delivered_order(&db, true).await;
    order_api(&db).force_confirm(order.id, ADMIN).await.unwrap();
    let wallets = WalletApi::new(db.clone());

    let after_bonus =
        wallets.adjust(RIDER, Money::from(250), "Rainy day bonus", AdjustmentType::Bonus, ADMIN).await.unwrap();
    assert_eq!(after_bonus.total_earned, Money::from(1250));
    assert_eq!(after_bonus.pending_balance, Money::from(1000));

    let after_deduction =
        wallets.adjust(RIDER, Money::from(400), "Damaged shirt", AdjustmentType::Deduction, ADMIN).await.unwrap();
    assert_eq!(after_deduction.total_earned, Money::from(850));
    assert_eq!(after_deduction.pending_balance, Money::from(1000));

    let history = wallets.transactions_for(RIDER).await.unwrap();
    let types = history.iter().map(|t| t.tx_type).collect::<Vec<_>>();
    assert_eq!(types, vec![TransactionType::Earning, TransactionType::Bonus, TransactionType::Deduction]);
    assert!(history.iter().all(|t| t.amount > Money::zero()), "amounts are stored unsigned");
    assert_eq!(history[2].performed_by.as_deref(), Some(ADMIN));
    assert_eq!(history[0].order_id, Some(order.id));

    let reconciliation = wallets.reconcile(RIDER).await.unwrap();
    assert!(reconciliation.is_consistent(), "{reconciliation}");
    assert_eq!(reconciliation.signed_transactions, Money::from(850));

    let audit = db.fetch_audit_entries_for(&format!("wallet:{RIDER}")).await.unwrap();
    assert_eq!(audit.iter().filter(|e| e.action == "wallet.adjusted").count(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn adjustments_need_a_reason_and_a_positive_amount() {
    let db = setup().await;
    let wallets = WalletApi::new(db.clone());
    let err = wallets.adjust(RIDER, Money::from(100), "  ", AdjustmentType::Bonus, ADMIN).await.expect_err("no reason");
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = wallets.adjust(RIDER, Money::zero(), "nothing", AdjustmentType::Bonus, ADMIN).await.expect_err("zero");
    assert!(matches!(err, LedgerError::Validation(_)));
    let err =
        wallets.adjust(RIDER, Money::from(-5), "negative", AdjustmentType::Deduction, ADMIN).await.expect_err("negative");
    assert!(matches!(err, LedgerError::Validation(_)));
    assert!(wallets.wallet_for(RIDER).await.unwrap().is_none());
    assert!(wallets.transactions_for(RIDER).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn credits_and_debits_keep_the_wallet_reconciled() {
    let db = setup().await;
    let wallets = WalletApi::new(db.clone());
    let balance = wallets.credit(PARTNER, Money::from(3000), "Opening balance", None).await.unwrap();
    assert_eq!(balance.total_earned, Money::from(3000));
    assert_eq!(balance.pending_balance, Money::from(3000));

    let balance = wallets.debit_pending(PARTNER, Money::from(1200), "Cash payout").await.unwrap();
    assert_eq!(balance.total_earned, Money::from(3000));
    assert_eq!(balance.pending_balance, Money::from(1800));

    let err = wallets.credit(PARTNER, Money::zero(), "nothing", None).await.expect_err("zero credit");
    assert!(matches!(err, LedgerError::Validation(_)));

    // Manual credits have no commission behind them, so only the earnings side lines up
    let reconciliation = wallets.reconcile(PARTNER).await.unwrap();
    assert!(reconciliation.earned_matches());
    assert!(!reconciliation.pending_matches());
    tear_down(db).await;
}

#[tokio::test]
async fn debits_cannot_exceed_the_pending_balance() {
    let db = setup().await;
    let wallets = WalletApi::new(db.clone());
    wallets.credit(PARTNER, Money::from(100), "Opening balance", None).await.unwrap();

    let err = wallets.debit_pending(PARTNER, Money::from(5000), "Too much").await.expect_err("over-debit");
    assert!(matches!(err, LedgerError::Validation(ref msg) if msg.contains("does not cover")));
    let err = wallets.debit_pending(RIDER, Money::from(1), "No wallet").await.expect_err("no wallet yet");
    assert!(matches!(err, LedgerError::Validation(_)));

    let wallet = wallets.wallet_for(PARTNER).await.unwrap().unwrap();
    assert_eq!(wallet.pending_balance, Money::from(100));
    assert_eq!(wallets.transactions_for(PARTNER).await.unwrap().len(), 1);
    assert!(wallets.wallet_for(RIDER).await.unwrap().is_none());

    let balance = wallets.debit_pending(PARTNER, Money::from(100), "Everything").await.unwrap();
    assert_eq!(balance.pending_balance, Money::zero());
    assert_eq!(balance.total_earned, Money::from(100));
    tear_down(db).await;
}

#[tokio::test]
async fn an_unknown_wallet_reconciles_to_zero() {
    let db = setup().await;
    let reconciliation = WalletApi::new(db.clone()).reconcile("nobody").await.unwrap();
    assert!(reconciliation.is_consistent());
    assert_eq!(reconciliation.total_earned, Money::zero());
    tear_down(db).await;
}
