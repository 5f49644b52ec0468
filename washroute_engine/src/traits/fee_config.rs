use crate::{
    db_types::{FeeSchedule, FeeScheduleRecord},
    traits::LedgerError,
};

#[allow(async_fn_in_trait)]
pub trait FeeConfigManagement {
    /// Stores a new fee schedule, which becomes the current one. Earlier schedules are kept.
    async fn insert_fee_schedule(&self, schedule: FeeSchedule, set_by: &str)
        -> Result<FeeScheduleRecord, LedgerError>;

    async fn fetch_current_fee_schedule(&self) -> Result<Option<FeeScheduleRecord>, LedgerError>;

    /// Newest first.
    async fn fetch_fee_schedule_history(&self) -> Result<Vec<FeeScheduleRecord>, LedgerError>;
}
