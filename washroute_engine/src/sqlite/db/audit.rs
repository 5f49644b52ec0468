use chrono::Utc;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{AuditEntry, NewAuditEntry};

pub async fn insert_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<AuditEntry, sqlx::Error> {
    sqlx::query_as(
        r#"INSERT INTO audit_log (action, performed_by, target_entity, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
    )
    .bind(entry.action)
    .bind(entry.performed_by)
    .bind(entry.target_entity)
    .bind(Json(entry.metadata))
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_entries_for_target(target: &str, conn: &mut SqliteConnection) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM audit_log WHERE target_entity = $1 ORDER BY id ASC").bind(target).fetch_all(conn).await
}
