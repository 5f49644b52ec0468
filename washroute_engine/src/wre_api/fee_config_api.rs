use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    db_types::{FeeSchedule, FeeScheduleRecord, NewAuditEntry},
    traits::{AuditLog, FeeConfigManagement, LedgerError},
    wre_api::record_audit,
};

/// Reads and writes the fee schedule that new orders are priced with.
///
/// Only new orders see a change. Every order keeps the schedule it was created with.
pub struct FeeConfigApi<B> {
    db: B,
}

impl<B> Debug for FeeConfigApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FeeConfigApi")
    }
}

impl<B> FeeConfigApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> FeeConfigApi<B>
where B: FeeConfigManagement + AuditLog
{
    /// Validates and stores a new fee schedule, which becomes the current one.
    pub async fn set_fee_schedule(&self, schedule: FeeSchedule, performed_by: &str) -> Result<FeeScheduleRecord, LedgerError> {
        schedule.validate().map_err(LedgerError::Validation)?;
        let record = self.db.insert_fee_schedule(schedule, performed_by).await?;
        info!("⚙️ Fee schedule #{} set by {performed_by}: {}", record.id, record.schedule);
        let entry = NewAuditEntry::new("fee_schedule.set", performed_by, format!("fee_schedule:{}", record.id))
            .with_metadata(json!({
                "service_fee_bps": schedule.service_fee.basis_points(),
                "delivery_fee": schedule.delivery_fee.value(),
                "per_item_fee": schedule.per_item_fee.value(),
            }));
        record_audit(&self.db, entry).await;
        Ok(record)
    }

    pub async fn current_fee_schedule(&self) -> Result<FeeSchedule, LedgerError> {
        current_schedule_or_default(&self.db).await
    }

    pub async fn fee_schedule_history(&self) -> Result<Vec<FeeScheduleRecord>, LedgerError> {
        self.db.fetch_fee_schedule_history().await
    }
}

/// The current schedule, or a zero-fee schedule if none has ever been set.
pub(crate) async fn current_schedule_or_default<B: FeeConfigManagement>(db: &B) -> Result<FeeSchedule, LedgerError> {
    match db.fetch_current_fee_schedule().await? {
        Some(record) => Ok(record.schedule),
        None => {
            warn!("⚙️ No fee schedule has been configured. Orders are being priced without any fees.");
            Ok(FeeSchedule::default())
        },
    }
}
