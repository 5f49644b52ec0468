use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{FeeSchedule, FeeScheduleRecord};

pub async fn insert_fee_schedule(
    schedule: FeeSchedule,
    set_by: &str,
    conn: &mut SqliteConnection,
) -> Result<FeeScheduleRecord, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO fee_schedules (service_fee, delivery_fee, per_item_fee, set_by, created_at)
        VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
    )
    .bind(schedule.service_fee)
    .bind(schedule.delivery_fee)
    .bind(schedule.per_item_fee)
    .bind(set_by)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// The most recently written schedule is the current one.
pub async fn fetch_current_fee_schedule(conn: &mut SqliteConnection) -> Result<Option<FeeScheduleRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM fee_schedules ORDER BY id DESC LIMIT 1").fetch_optional(conn).await
}

pub async fn fetch_fee_schedule_history(conn: &mut SqliteConnection) -> Result<Vec<FeeScheduleRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM fee_schedules ORDER BY id DESC").fetch_all(conn).await
}
