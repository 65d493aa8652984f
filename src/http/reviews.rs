//! Product review endpoints. One review per user per product; editing or
//! deleting somebody else's review looks exactly like a 404.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::models::ReviewDetail;
use crate::db::{product_repo, review_repo};
use crate::error::StoreError;
use crate::http::auth::JwtAuth;

#[derive(Deserialize)]
pub struct CreateReviewReq {
    pub product_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateReviewReq {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}

#[derive(Serialize)]
pub struct ReviewPage {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub average_rating: Option<f64>,
    pub results: Vec<ReviewDetail>,
}

fn rating_valid(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// POST /api/reviews
#[post("/reviews")]
pub async fn create_review(
    auth: JwtAuth,
    info: web::Json<CreateReviewReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if !rating_valid(info.rating) {
        return Ok(HttpResponse::BadRequest().body("rating must be between 1 and 5"));
    }

    // The product must exist; FK alone would give an opaque 500.
    product_repo::get(&db, info.product_id)
        .await?
        .ok_or(StoreError::NotFound)?;

    let review = review_repo::create(
        &db,
        auth.user_id,
        info.product_id,
        info.rating,
        info.comment.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Created().json(review))
}

/// GET /api/products/{id}/reviews
#[get("/products/{id}/reviews")]
pub async fn list_reviews(
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let (results, total, average_rating) =
        review_repo::list_by_product(&db, path.into_inner(), query.page, query.page_size).await?;
    Ok(HttpResponse::Ok().json(ReviewPage {
        total,
        page: query.page,
        page_size: query.page_size,
        average_rating,
        results,
    }))
}

/// PATCH /api/reviews/{id}
#[patch("/reviews/{id}")]
pub async fn update_review(
    auth: JwtAuth,
    path: web::Path<i64>,
    info: web::Json<UpdateReviewReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if matches!(info.rating, Some(r) if !rating_valid(r)) {
        return Ok(HttpResponse::BadRequest().body("rating must be between 1 and 5"));
    }
    let review = review_repo::update(
        &db,
        path.into_inner(),
        auth.user_id,
        info.rating,
        info.comment.as_deref(),
    )
    .await?
    .ok_or(StoreError::NotFound)?;
    Ok(HttpResponse::Ok().json(review))
}

/// DELETE /api/reviews/{id}
#[delete("/reviews/{id}")]
pub async fn delete_review(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if review_repo::delete(&db, path.into_inner(), auth.user_id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(StoreError::NotFound.into())
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_review)
        .service(list_reviews)
        .service(update_review)
        .service(delete_review);
}
