//! `SqliteDatabase` is the concrete ledger backend.
//!
//! It implements every trait in the [`crate::traits`] module by composing the low-level functions in
//! [`super::db`], wrapping multi-step operations in a single transaction.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{audit, commissions, db_url, directory, fee_config, new_pool, orders, payouts, wallets};
use crate::{
    db_types::{
        AuditEntry,
        Commission,
        ConfirmedBy,
        DirectoryUser,
        FeeSchedule,
        FeeScheduleRecord,
        LedgerEntry,
        Money,
        NewAuditEntry,
        NewPayout,
        Order,
        OrderCode,
        OrderInsert,
        OrderStatusType,
        Payout,
        PayoutBatchStatus,
        TransactionType,
        WalletBalance,
        WalletTransaction,
    },
    helpers::plan_commissions,
    order_objects::OrderQueryFilter,
    traits::{
        AuditLog,
        CommissionManagement,
        CommissionOutcome,
        FeeConfigManagement,
        LedgerDatabase,
        LedgerError,
        LedgerTotals,
        OrderManagement,
        PaymentUpdate,
        PayoutResolution,
        SettlementManagement,
        UserDirectory,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `WRS_DATABASE_URL` environment variable (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Wraps a conditional payment update: when nothing matched, works out whether the order exists at all.
async fn payment_update_result(
    reference: &str,
    updated: Option<Order>,
    conn: &mut sqlx::SqliteConnection,
) -> Result<PaymentUpdate, LedgerError> {
    let result = match updated {
        Some(order) => PaymentUpdate::Applied(order),
        None => match orders::fetch_order_by_payment_reference(reference, conn).await? {
            Some(order) => PaymentUpdate::Unchanged(order),
            None => PaymentUpdate::NotFound,
        },
    };
    Ok(result)
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: OrderInsert) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_code, order.id);
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_code(code, &mut conn).await?)
    }

    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_reference(reference, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn assign_order(&self, id: i64, rider_id: &str, partner_id: &str) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::assign_order(id, rider_id, partner_id, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        id: i64,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::compare_and_set_status(id, expected, new_status, &mut conn).await?)
    }

    async fn confirm_order(&self, id: i64, confirmed_by: ConfirmedBy) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::confirm_order(id, confirmed_by, &mut conn).await?)
    }

    async fn mark_payment_success(
        &self,
        reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaymentUpdate, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_payment_success(reference, paid_at, &mut tx).await?;
        let result = payment_update_result(reference, updated, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn mark_payment_failed(&self, reference: &str) -> Result<PaymentUpdate, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_payment_failed(reference, &mut tx).await?;
        let result = payment_update_result(reference, updated, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn expire_unpaid_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::expire_unpaid_orders(cutoff, &mut conn).await?)
    }
}

impl CommissionManagement for SqliteDatabase {
    /// Runs in a single transaction:
    /// 1. Lock the order row (a write, so SQLite grants the write lock up front) and re-read it.
    /// 2. If the order is disbursed already, return what is stored.
    /// 3. Insert each due commission with `ON CONFLICT DO NOTHING`, and credit the wallet only for rows that were
    ///    really inserted.
    /// 4. Flip `is_disbursed` once both rider and partner shares exist.
    async fn create_order_commissions(
        &self,
        order_id: i64,
        confirmed_by: ConfirmedBy,
    ) -> Result<CommissionOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(format!("#{order_id}")))?;
        if order.is_disbursed {
            let existing = commissions::fetch_commissions_for_order(order_id, &mut tx).await?;
            tx.rollback().await?;
            debug!("🗃️ Order {} is already disbursed. {} commissions on record", order.order_code, existing.len());
            return Ok(CommissionOutcome::Existing(existing));
        }
        let mut created = Vec::new();
        for new_commission in plan_commissions(&order, confirmed_by) {
            let Some(commission) = commissions::insert_commission(new_commission, &mut tx).await? else {
                continue;
            };
            if let Some(user_id) = &commission.beneficiary_id {
                let description = format!(
                    "{} for order {}",
                    commission.commission_type.as_str().replace('_', " "),
                    order.order_code.as_str()
                );
                let entry = LedgerEntry::new(user_id.as_str(), TransactionType::Earning, commission.amount, description)
                    .for_order(order_id);
                wallets::apply_ledger_entry(entry, &mut tx).await?;
            }
            created.push(commission);
        }
        if order.is_fully_assigned() {
            orders::mark_disbursed(order_id, &mut tx).await?;
        }
        let all = commissions::fetch_commissions_for_order(order_id, &mut tx).await?;
        tx.commit().await?;
        if created.is_empty() {
            Ok(CommissionOutcome::Existing(all))
        } else {
            debug!("🗃️ {} new commissions stored for order {}", created.len(), order.order_code);
            Ok(CommissionOutcome::Created { created, all })
        }
    }

    async fn fetch_commissions_for_order(&self, order_id: i64) -> Result<Vec<Commission>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::fetch_commissions_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_commissions_for_user(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::fetch_commissions_for_user(user_id, &mut conn).await?)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn record_ledger_entry(&self, entry: LedgerEntry) -> Result<WalletBalance, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::apply_ledger_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<WalletBalance>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::fetch_wallet(user_id, &mut conn).await?)
    }

    async fn fetch_wallet_transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::fetch_transactions(user_id, &mut conn).await?)
    }

    async fn ledger_totals(&self, user_id: &str) -> Result<LedgerTotals, LedgerError> {
        // Both sums come from one read transaction so they describe the same moment.
        let mut tx = self.pool.begin().await?;
        let signed_transactions = wallets::sum_signed_transactions(user_id, &mut tx).await?;
        let unpaid_commissions = commissions::sum_unpaid_for_user(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(LedgerTotals { signed_transactions, unpaid_commissions })
    }
}

impl SettlementManagement for SqliteDatabase {
    async fn mature_commissions(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Commission>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::mature_commissions(cutoff, now, &mut conn).await?)
    }

    async fn fetch_payout_eligible_commissions(&self, user_id: &str) -> Result<Vec<Commission>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::fetch_payout_eligible(user_id, &mut conn).await?)
    }

    async fn open_payout(&self, payout: NewPayout) -> Result<Payout, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = payouts::insert_payout(&payout, &mut tx).await?;
        for id in &payout.commission_ids {
            if !commissions::claim_for_payout(*id, &payout.user_id, &payout.reference, &mut tx).await? {
                tx.rollback().await?;
                warn!("🗃️ Commission #{id} is no longer eligible for payout {}. Nothing was changed.", payout.reference);
                return Err(LedgerError::InvalidTransition(format!(
                    "Commission #{id} is no longer eligible for payout"
                )));
            }
        }
        tx.commit().await?;
        Ok(record)
    }

    async fn record_transfer_code(&self, reference: &str, transfer_code: &str) -> Result<Payout, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        payouts::set_transfer_code(reference, transfer_code, &mut conn)
            .await?
            .ok_or_else(|| LedgerError::PayoutNotFound(reference.to_string()))
    }

    async fn complete_payout(&self, reference: &str) -> Result<PayoutResolution, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(payout) = payouts::resolve_payout(reference, PayoutBatchStatus::Paid, None, &mut tx).await? else {
            let existing = payouts::fetch_payout(reference, &mut tx).await?;
            tx.rollback().await?;
            return existing
                .map(PayoutResolution::AlreadyResolved)
                .ok_or_else(|| LedgerError::PayoutNotFound(reference.to_string()));
        };
        let paid = commissions::mark_transfer_paid(reference, &mut tx).await?;
        let paid_total: Money = paid.iter().map(|c| c.amount).sum();
        if paid_total != payout.amount {
            warn!(
                "🗃️ Payout {reference} was for {} but its commissions add up to {paid_total}. Debiting the commission \
                 total.",
                payout.amount
            );
        }
        let entry = LedgerEntry::new(
            payout.user_id.as_str(),
            TransactionType::Payout,
            paid_total,
            format!("Payout {reference}"),
        )
        .performed_by(payout.initiated_by.as_str());
        wallets::apply_ledger_entry(entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payout {reference} paid. {} commissions settled", paid.len());
        Ok(PayoutResolution::Resolved { payout, commissions: paid })
    }

    async fn fail_payout(&self, reference: &str, reason: &str) -> Result<PayoutResolution, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(payout) =
            payouts::resolve_payout(reference, PayoutBatchStatus::Failed, Some(reason), &mut tx).await?
        else {
            let existing = payouts::fetch_payout(reference, &mut tx).await?;
            tx.rollback().await?;
            return existing
                .map(PayoutResolution::AlreadyResolved)
                .ok_or_else(|| LedgerError::PayoutNotFound(reference.to_string()));
        };
        let failed = commissions::mark_transfer_failed(reference, reason, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payout {reference} failed ({reason}). {} commissions are payout-eligible again", failed.len());
        Ok(PayoutResolution::Resolved { payout, commissions: failed })
    }

    async fn fetch_payout(&self, reference: &str) -> Result<Option<Payout>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_payout(reference, &mut conn).await?)
    }

    async fn fetch_payouts_for_user(&self, user_id: &str) -> Result<Vec<Payout>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_payouts_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_commissions_for_payout(&self, reference: &str) -> Result<Vec<Commission>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::fetch_commissions_for_transfer(reference, &mut conn).await?)
    }
}

impl FeeConfigManagement for SqliteDatabase {
    async fn insert_fee_schedule(
        &self,
        schedule: FeeSchedule,
        set_by: &str,
    ) -> Result<FeeScheduleRecord, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fee_config::insert_fee_schedule(schedule, set_by, &mut conn).await?)
    }

    async fn fetch_current_fee_schedule(&self) -> Result<Option<FeeScheduleRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fee_config::fetch_current_fee_schedule(&mut conn).await?)
    }

    async fn fetch_fee_schedule_history(&self) -> Result<Vec<FeeScheduleRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fee_config::fetch_fee_schedule_history(&mut conn).await?)
    }
}

impl AuditLog for SqliteDatabase {
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::insert_entry(entry, &mut conn).await?)
    }

    async fn fetch_audit_entries_for(&self, target_entity: &str) -> Result<Vec<AuditEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::fetch_entries_for_target(target_entity, &mut conn).await?)
    }
}

impl UserDirectory for SqliteDatabase {
    async fn fetch_directory_user(&self, id: &str) -> Result<Option<DirectoryUser>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(directory::fetch_user(id, &mut conn).await?)
    }

    async fn upsert_directory_user(&self, user: DirectoryUser) -> Result<DirectoryUser, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(directory::upsert_user(user, &mut conn).await?)
    }
}
