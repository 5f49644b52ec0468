use sqlx::SqliteConnection;

use crate::db_types::DirectoryUser;

pub async fn fetch_user(id: &str, conn: &mut SqliteConnection) -> Result<Option<DirectoryUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM directory_users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn upsert_user(user: DirectoryUser, conn: &mut SqliteConnection) -> Result<DirectoryUser, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO directory_users (id, role, display_name, is_active, payout_recipient)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                role = excluded.role,
                display_name = excluded.display_name,
                is_active = excluded.is_active,
                payout_recipient = excluded.payout_recipient
            RETURNING *;
        "#,
    )
    .bind(user.id)
    .bind(user.role)
    .bind(user.display_name)
    .bind(user.is_active)
    .bind(user.payout_recipient)
    .fetch_one(conn)
    .await
}
