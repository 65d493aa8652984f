//! Order storage. Inserts happen only inside the checkout transaction;
//! reads and status updates are plain pool operations.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::checkout::OrderDraft;
use crate::db::models::{Order, OrderLineDetail, OrderStatus};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLineDetail>,
}

/// Persists a priced draft and its line snapshots. Caller owns the
/// transaction; nothing here commits.
pub async fn insert(conn: &mut PgConnection, draft: &OrderDraft) -> Result<i64, StoreError> {
    let order_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO orders (user_id, subtotal, tax, total, status, payment_ref)
        VALUES ($1, $2, $3, $4, 'pending', $5)
        RETURNING id
        "#,
    )
    .bind(draft.user_id)
    .bind(draft.subtotal)
    .bind(draft.tax)
    .bind(draft.total)
    .bind(&draft.payment_ref)
    .fetch_one(&mut *conn)
    .await?;

    for line in &draft.lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}

/// Fetches an order with its lines. When `owner` is given, an order
/// belonging to someone else comes back as `None` — callers cannot tell
/// "not yours" apart from "does not exist".
pub async fn get(
    pool: &PgPool,
    order_id: i64,
    owner: Option<i64>,
) -> Result<Option<OrderDetail>, StoreError> {
    let Some(order) = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    if let Some(user_id) = owner {
        if order.user_id != user_id {
            return Ok(None);
        }
    }

    let lines = fetch_lines(pool, order_id).await?;
    Ok(Some(OrderDetail { order, lines }))
}

pub async fn list_by_user(
    pool: &PgPool,
    user_id: i64,
    page: u32,
    page_size: u32,
) -> Result<(Vec<OrderDetail>, i64), StoreError> {
    let offset = (page.max(1) as i64 - 1) * page_size as i64;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
         WHERE user_id = $1
         ORDER BY created_at DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(offset)
    .bind(page_size as i64)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = fetch_lines(pool, order.id).await?;
        out.push(OrderDetail { order, lines });
    }
    Ok((out, total))
}

pub async fn list_all(
    pool: &PgPool,
    page: u32,
    page_size: u32,
    status: Option<OrderStatus>,
) -> Result<(Vec<OrderDetail>, i64), StoreError> {
    let offset = (page.max(1) as i64 - 1) * page_size as i64;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(pool)
            .await?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
         WHERE ($1::order_status IS NULL OR status = $1)
         ORDER BY created_at DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(status)
    .bind(offset)
    .bind(page_size as i64)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = fetch_lines(pool, order.id).await?;
        out.push(OrderDetail { order, lines });
    }
    Ok((out, total))
}

/// Status transitions are unconstrained (any state from any state).
/// Entering `completed` stamps `completed_at` exactly once; re-setting
/// `completed` keeps the original timestamp.
pub async fn update_status(
    pool: &PgPool,
    order_id: i64,
    status: OrderStatus,
) -> Result<Option<OrderDetail>, StoreError> {
    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
           SET status = $2,
               completed_at = CASE
                   WHEN $2 = 'completed'::order_status THEN COALESCE(completed_at, now())
                   ELSE completed_at
               END
         WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(status)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(order) => {
            let lines = fetch_lines(pool, order.id).await?;
            Ok(Some(OrderDetail { order, lines }))
        }
        None => Ok(None),
    }
}

async fn fetch_lines(pool: &PgPool, order_id: i64) -> Result<Vec<OrderLineDetail>, StoreError> {
    let lines = sqlx::query_as::<_, OrderLineDetail>(
        r#"
        SELECT ol.id, ol.product_id, p.title, ol.quantity, ol.unit_price, ol.subtotal
          FROM order_lines ol
          JOIN products p ON p.id = ol.product_id
         WHERE ol.order_id = $1
         ORDER BY ol.id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}
