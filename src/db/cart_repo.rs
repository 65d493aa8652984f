//! Cart storage: one lazily-created cart per user, deduplicated lines,
//! and the locked read the checkout transaction builds on.

use sqlx::{PgConnection, PgPool};

use crate::db::models::{Cart, CartLine, CartLineDetail};
use crate::error::StoreError;

pub async fn get_or_create(pool: &PgPool, user_id: i64) -> Result<Cart, StoreError> {
    if let Some(cart) = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
    {
        return Ok(cart);
    }

    // Two racing first-touches can both miss the SELECT; the upsert makes
    // the create idempotent.
    let cart = sqlx::query_as::<_, Cart>(
        r#"
        INSERT INTO carts (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(cart)
}

/// Adds a line, bumping the quantity when the product is already in the
/// cart rather than duplicating the line.
pub async fn add_line(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<CartLine, StoreError> {
    let cart = get_or_create(pool, user_id).await?;

    let line = sqlx::query_as::<_, CartLine>(
        r#"
        INSERT INTO cart_lines (cart_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(cart.id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    touch(pool, cart.id).await?;
    Ok(line)
}

/// Sets a line's quantity. Ownership is part of the WHERE clause: a line
/// in somebody else's cart behaves exactly like a missing line.
pub async fn update_line_quantity(
    pool: &PgPool,
    line_id: i64,
    quantity: i32,
    user_id: i64,
) -> Result<Option<CartLine>, StoreError> {
    let line = sqlx::query_as::<_, CartLine>(
        r#"
        UPDATE cart_lines cl
           SET quantity = $2
          FROM carts c
         WHERE cl.id = $1 AND cl.cart_id = c.id AND c.user_id = $3
        RETURNING cl.*
        "#,
    )
    .bind(line_id)
    .bind(quantity)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(line)
}

pub async fn remove_line(pool: &PgPool, line_id: i64, user_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_lines cl
         USING carts c
         WHERE cl.id = $1 AND cl.cart_id = c.id AND c.user_id = $2
        "#,
    )
    .bind(line_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Empties the user's cart. Runs on a plain connection so checkout can
/// call it inside its transaction.
pub async fn clear(conn: &mut PgConnection, user_id: i64) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        DELETE FROM cart_lines cl
         USING carts c
         WHERE cl.cart_id = c.id AND c.user_id = $1
        "#,
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get_with_lines(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<(Cart, Vec<CartLineDetail>)>, StoreError> {
    let Some(cart) = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, CartLineDetail>(
        r#"
        SELECT cl.id, cl.product_id, cl.quantity,
               p.title, p.image_url, p.price, p.stock
          FROM cart_lines cl
          JOIN products p ON p.id = cl.product_id
         WHERE cl.cart_id = $1
         ORDER BY cl.id
        "#,
    )
    .bind(cart.id)
    .fetch_all(pool)
    .await?;

    Ok(Some((cart, lines)))
}

/// Locked read for checkout: takes `FOR UPDATE` on the cart row (totally
/// ordering concurrent checkouts for the same user) and on the line and
/// product rows (serializing stock checks on a shared product across
/// users). The locks live until the enclosing transaction ends.
pub async fn lock_with_lines(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<Option<(Cart, Vec<CartLineDetail>)>, StoreError> {
    let Some(cart) =
        sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
    else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, CartLineDetail>(
        r#"
        SELECT cl.id, cl.product_id, cl.quantity,
               p.title, p.image_url, p.price, p.stock
          FROM cart_lines cl
          JOIN products p ON p.id = cl.product_id
         WHERE cl.cart_id = $1
         ORDER BY cl.id
           FOR UPDATE OF cl, p
        "#,
    )
    .bind(cart.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some((cart, lines)))
}

async fn touch(pool: &PgPool, cart_id: i64) -> Result<(), StoreError> {
    sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}
