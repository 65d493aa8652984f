//! Order endpoints: checkout plus owner-scoped reads and admin status
//! management.

use actix_web::{get, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::checkout;
use crate::db::models::OrderStatus;
use crate::db::order_repo::{self, OrderDetail};
use crate::error::StoreError;
use crate::http::auth::JwtAuth;

#[derive(Deserialize)]
pub struct CheckoutReq {
    /// Opaque external payment confirmation, e.g. a Stripe payment
    /// intent id. Optional; uniqueness is enforced by the storage layer.
    pub payment_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Deserialize)]
pub struct AdminPageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub status: Option<OrderStatus>,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}

#[derive(Deserialize)]
pub struct StatusUpdateReq {
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct OrderPage {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<OrderDetail>,
}

/// POST /api/orders/checkout
#[post("/orders/checkout")]
pub async fn create_order(
    auth: JwtAuth,
    info: web::Json<CheckoutReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let order = checkout::checkout(&db, auth.user_id, info.payment_ref.as_deref()).await?;
    Ok(HttpResponse::Created().json(order))
}

/// GET /api/orders
#[get("/orders")]
pub async fn list_orders(
    auth: JwtAuth,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let (results, total) =
        order_repo::list_by_user(&db, auth.user_id, query.page, query.page_size).await?;
    Ok(HttpResponse::Ok().json(OrderPage {
        total,
        page: query.page,
        page_size: query.page_size,
        results,
    }))
}

/// GET /api/orders/all  (admin)
#[get("/orders/all")]
pub async fn list_all_orders(
    auth: JwtAuth,
    query: web::Query<AdminPageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    let (results, total) =
        order_repo::list_all(&db, query.page, query.page_size, query.status).await?;
    Ok(HttpResponse::Ok().json(OrderPage {
        total,
        page: query.page,
        page_size: query.page_size,
        results,
    }))
}

/// GET /api/orders/{id}
///
/// Admins see any order; everyone else only their own, and an order that
/// exists but belongs to someone else is served exactly like a missing
/// one.
#[get("/orders/{id}")]
pub async fn get_order(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let owner = if auth.is_admin {
        None
    } else {
        Some(auth.user_id)
    };
    let order = order_repo::get(&db, path.into_inner(), owner)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(HttpResponse::Ok().json(order))
}

/// PATCH /api/orders/{id}/status  (admin)
#[patch("/orders/{id}/status")]
pub async fn update_status(
    auth: JwtAuth,
    path: web::Path<i64>,
    info: web::Json<StatusUpdateReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    let order = order_repo::update_status(&db, path.into_inner(), info.status)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(HttpResponse::Ok().json(order))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // `/orders/all` must mount before `/orders/{id}`.
    cfg.service(create_order)
        .service(list_orders)
        .service(list_all_orders)
        .service(get_order)
        .service(update_status);
}
