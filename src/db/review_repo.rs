//! Review storage: one review per user per product, enforced both here
//! and by the unique index.

use sqlx::PgPool;

use crate::db::models::{Review, ReviewDetail};
use crate::error::{on_unique_violation, StoreError};

pub async fn create(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    rating: i32,
    comment: Option<&str>,
) -> Result<Review, StoreError> {
    sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (product_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(user_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(pool)
    .await
    .map_err(|e| on_unique_violation(e, "reviews", StoreError::DuplicateReview(product_id)))
}

pub async fn get(pool: &PgPool, review_id: i64) -> Result<Option<Review>, StoreError> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(review_id)
        .fetch_optional(pool)
        .await?;
    Ok(review)
}

pub async fn list_by_product(
    pool: &PgPool,
    product_id: i64,
    page: u32,
    page_size: u32,
) -> Result<(Vec<ReviewDetail>, i64, Option<f64>), StoreError> {
    let offset = (page.max(1) as i64 - 1) * page_size as i64;

    let (total, average): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), AVG(rating)::FLOAT8 FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, ReviewDetail>(
        r#"
        SELECT r.id, r.product_id, r.user_id, u.full_name AS user_name,
               r.rating, r.comment, r.created_at, r.updated_at
          FROM reviews r
          JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1
         ORDER BY r.created_at DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(product_id)
    .bind(offset)
    .bind(page_size as i64)
    .fetch_all(pool)
    .await?;

    Ok((rows, total, average))
}

/// Ownership lives in the WHERE clause; editing someone else's review
/// behaves like editing a review that does not exist.
pub async fn update(
    pool: &PgPool,
    review_id: i64,
    user_id: i64,
    rating: Option<i32>,
    comment: Option<&str>,
) -> Result<Option<Review>, StoreError> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews
           SET rating     = COALESCE($3, rating),
               comment    = COALESCE($4, comment),
               updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(review_id)
    .bind(user_id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(pool)
    .await?;
    Ok(review)
}

pub async fn delete(pool: &PgPool, review_id: i64, user_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
        .bind(review_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
