//! Product storage: catalog CRUD plus the atomic stock operations the
//! checkout transaction relies on.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::db::models::Product;
use crate::error::{on_fk_violation, on_unique_violation, StoreError};

/// Admin-supplied fields for a new product; metadata comes from RAWG.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub rawg_id: i64,
    pub price: Decimal,
    pub stock: i32,
}

/// Upstream metadata snapshot captured once at creation time.
#[derive(Debug, Clone)]
pub struct RawgMetadata {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub description: Option<String>,
}

pub async fn create(
    pool: &PgPool,
    new: &NewProduct,
    meta: &RawgMetadata,
) -> Result<Product, StoreError> {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (rawg_id, title, slug, description, image_url, price, stock)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new.rawg_id)
    .bind(&meta.title)
    .bind(&meta.slug)
    .bind(&meta.description)
    .bind(&meta.image_url)
    .bind(new.price)
    .bind(new.stock)
    .fetch_one(pool)
    .await
    .map_err(|e| on_unique_violation(e, "rawg_id", StoreError::DuplicateExternalId(new.rawg_id)))
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Product>, StoreError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

pub async fn get_by_rawg_id(pool: &PgPool, rawg_id: i64) -> Result<Option<Product>, StoreError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE rawg_id = $1")
        .bind(rawg_id)
        .fetch_optional(pool)
        .await?;
    Ok(product)
}

pub async fn list(
    pool: &PgPool,
    page: u32,
    page_size: u32,
    in_stock_only: bool,
) -> Result<(Vec<Product>, i64), StoreError> {
    let offset = (page.max(1) as i64 - 1) * page_size as i64;

    let total: i64 = if in_stock_only {
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE stock > 0")
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await?
    };

    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT * FROM products
        WHERE (NOT $1) OR stock > 0
        ORDER BY created_at DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(in_stock_only)
    .bind(offset)
    .bind(page_size as i64)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &UpdateProduct,
) -> Result<Option<Product>, StoreError> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
           SET price       = COALESCE($2, price),
               stock       = COALESCE($3, stock),
               description = COALESCE($4, description),
               updated_at  = now()
         WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.price)
    .bind(changes.stock)
    .bind(&changes.description)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

/// Deleting a product referenced by any order line is refused by the
/// RESTRICT rule; that surfaces as `ProductInUse`.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| on_fk_violation(e, StoreError::ProductInUse))?;
    Ok(result.rows_affected() > 0)
}

/// Check-and-decrement in a single conditional UPDATE, so the row lock
/// serializes concurrent decrements and the check always sees the
/// authoritative in-transaction value. Takes a connection so it runs
/// either inside a caller's transaction or standalone.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: i64,
    quantity: i32,
) -> Result<Product, StoreError> {
    let updated = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
           SET stock = stock - $2, updated_at = now()
         WHERE id = $1 AND stock >= $2
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(product) = updated {
        return Ok(product);
    }

    // Nothing updated: either the product is gone or the stock is short.
    let current = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    match current {
        Some(p) => Err(StoreError::InsufficientStock {
            product_id,
            title: p.title,
            available: p.stock,
            requested: quantity,
        }),
        None => Err(StoreError::NotFound),
    }
}

/// Inverse of `decrement_stock`, used as compensation when an order is
/// cancelled. The only failure mode is a missing product.
pub async fn increment_stock(
    conn: &mut PgConnection,
    product_id: i64,
    quantity: i32,
) -> Result<Product, StoreError> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
           SET stock = stock + $2, updated_at = now()
         WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(StoreError::NotFound)
}
