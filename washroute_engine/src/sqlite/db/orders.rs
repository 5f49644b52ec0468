use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{ConfirmedBy, Order, OrderCode, OrderInsert, OrderStatusType, PaymentStatus},
    order_objects::OrderQueryFilter,
    traits::LedgerError,
};

/// Inserts a new, priced order. The order starts in `created` status with a `pending` payment.
///
/// A clash on the order code is reported as [`LedgerError::DuplicateOrderCode`] so that the caller can generate a new
/// code and try again.
pub async fn insert_order(order: OrderInsert, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let OrderInsert { order_code, order, pricing, fees, payment_reference, created_at } = order;
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_code,
                client_id,
                client,
                items,
                items_subtotal,
                service_fee_amount,
                delivery_fee_amount,
                system_fee_amount,
                total_amount,
                service_fee,
                delivery_fee,
                per_item_fee,
                currency,
                status,
                payment_reference,
                payment_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING *;
        "#,
    )
    .bind(order_code.as_str())
    .bind(order.client_id)
    .bind(Json(order.client))
    .bind(Json(order.items))
    .bind(pricing.items_subtotal)
    .bind(pricing.service_fee_amount)
    .bind(pricing.delivery_fee_amount)
    .bind(pricing.system_fee_amount)
    .bind(pricing.total_amount)
    .bind(fees.service_fee)
    .bind(fees.delivery_fee)
    .bind(fees.per_item_fee)
    .bind(order.currency)
    .bind(OrderStatusType::Created)
    .bind(payment_reference)
    .bind(PaymentStatus::Pending)
    .bind(created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(e) if is_unique_violation(&e) => Err(LedgerError::DuplicateOrderCode(order_code.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_code(code: &OrderCode, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_code = $1").bind(code.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_payment_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_reference = $1").bind(reference).fetch_optional(conn).await
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, oldest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(client_id) = query.client_id {
        where_clause.push("client_id = ");
        where_clause.push_bind_unseparated(client_id);
    }
    if let Some(rider_id) = query.rider_id {
        where_clause.push("rider_id = ");
        where_clause.push_bind_unseparated(rider_id);
    }
    if let Some(partner_id) = query.partner_id {
        where_clause.push("partner_id = ");
        where_clause.push_bind_unseparated(partner_id);
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status);
    }
    if let Some(statuses) = query.statuses.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("julianday(created_at) >= julianday(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("julianday(created_at) <= julianday(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Bumps `updated_at` and returns the fresh row.
///
/// This is used as the first statement of write transactions that need to read an order and then act on it. Because
/// it is a write, SQLite hands the transaction the write lock before the read happens, so nobody else can change the
/// order in between.
pub async fn lock_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET updated_at = $1 WHERE id = $2 RETURNING *")
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Attaches a rider and a partner and moves the order to `assigned`. Only orders still in `created` qualify.
pub async fn assign_order(
    id: i64,
    rider_id: &str,
    partner_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"UPDATE orders SET rider_id = $1, partner_id = $2, status = $3, updated_at = $4
        WHERE id = $5 AND status = $6 RETURNING *"#,
    )
    .bind(rider_id)
    .bind(partner_id)
    .bind(OrderStatusType::Assigned)
    .bind(Utc::now())
    .bind(id)
    .bind(OrderStatusType::Created)
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        debug!("📝️ Order {} assigned to rider {rider_id} and partner {partner_id}", o.order_code);
    }
    Ok(order)
}

/// Compare-and-swap on the order status. The update only lands if the stored status is still `expected`.
pub async fn compare_and_set_status(
    id: i64,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
        .bind(new_status)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .fetch_optional(conn)
        .await
}

/// Sets the confirmation flags on a delivered order. An admin confirmation sets both flags.
pub async fn confirm_order(
    id: i64,
    confirmed_by: ConfirmedBy,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = match confirmed_by {
        ConfirmedBy::Client => {
            "UPDATE orders SET is_confirmed_by_client = 1, updated_at = $1 WHERE id = $2 AND status = $3 RETURNING *"
        },
        ConfirmedBy::Admin | ConfirmedBy::System => {
            r#"UPDATE orders SET is_confirmed_by_client = 1, is_admin_confirmed = 1, updated_at = $1
            WHERE id = $2 AND status = $3 RETURNING *"#
        },
    };
    sqlx::query_as(sql).bind(Utc::now()).bind(id).bind(OrderStatusType::Delivered).fetch_optional(conn).await
}

/// Records a successful charge. Returns `None` if there is no such reference, or the payment was already a success.
pub async fn set_payment_success(
    reference: &str,
    paid_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE orders SET payment_status = $1, paid_at = $2, updated_at = $3
        WHERE payment_reference = $4 AND payment_status != $1 RETURNING *"#,
    )
    .bind(PaymentStatus::Success)
    .bind(paid_at)
    .bind(Utc::now())
    .bind(reference)
    .fetch_optional(conn)
    .await
}

/// Records a failed charge. A payment that already succeeded is never downgraded.
pub async fn set_payment_failed(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE orders SET payment_status = $1, updated_at = $2
        WHERE payment_reference = $3 AND payment_status NOT IN ($1, $4) RETURNING *"#,
    )
    .bind(PaymentStatus::Failed)
    .bind(Utc::now())
    .bind(reference)
    .bind(PaymentStatus::Success)
    .fetch_optional(conn)
    .await
}

/// Cancels every unpaid order (payment still pending, or the charge failed) that was created at or before `cutoff`.
/// The payment is marked as abandoned.
pub async fn expire_unpaid_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"UPDATE orders SET payment_status = $1, status = $2, updated_at = $3
        WHERE payment_status IN ($4, $5) AND status IN ($6, $7) AND julianday(created_at) <= julianday($8)
        RETURNING *"#,
    )
    .bind(PaymentStatus::Abandoned)
    .bind(OrderStatusType::Cancelled)
    .bind(Utc::now())
    .bind(PaymentStatus::Pending)
    .bind(PaymentStatus::Failed)
    .bind(OrderStatusType::Created)
    .bind(OrderStatusType::Assigned)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    debug!("📝️ {} unpaid orders expired", orders.len());
    Ok(orders)
}

/// Flips `is_disbursed` from false to true. Returns `false` if it was already set.
pub async fn mark_disbursed(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET is_disbursed = 1, updated_at = $1 WHERE id = $2 AND is_disbursed = 0")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
