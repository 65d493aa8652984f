//! Shopping-cart endpoints. Mutations validate the product and its stock
//! before touching the cart; reads return computed subtotals and a cart
//! total.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::models::CartLineDetail;
use crate::db::{cart_repo, product_repo};
use crate::error::StoreError;
use crate::http::auth::JwtAuth;

#[derive(Deserialize)]
pub struct AddLineReq {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateLineReq {
    pub quantity: i32,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub title: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub in_stock: bool,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: i64,
    pub user_id: i64,
    pub lines: Vec<CartLineResponse>,
    pub total: Decimal,
}

fn render_cart(cart_id: i64, user_id: i64, lines: Vec<CartLineDetail>) -> CartResponse {
    let mut total = Decimal::ZERO;
    let lines = lines
        .into_iter()
        .map(|l| {
            let subtotal = Decimal::from(l.quantity) * l.price;
            total += subtotal;
            CartLineResponse {
                id: l.id,
                product_id: l.product_id,
                quantity: l.quantity,
                title: l.title,
                image_url: l.image_url,
                unit_price: l.price,
                subtotal,
                in_stock: l.stock >= l.quantity,
            }
        })
        .collect();
    CartResponse {
        id: cart_id,
        user_id,
        lines,
        total,
    }
}

async fn current_cart(db: &PgPool, user_id: i64) -> Result<CartResponse, StoreError> {
    match cart_repo::get_with_lines(db, user_id).await? {
        Some((cart, lines)) => Ok(render_cart(cart.id, user_id, lines)),
        None => {
            let cart = cart_repo::get_or_create(db, user_id).await?;
            Ok(render_cart(cart.id, user_id, Vec::new()))
        }
    }
}

/// GET /api/cart
#[get("/cart")]
pub async fn get_cart(
    auth: JwtAuth,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    Ok(HttpResponse::Ok().json(current_cart(&db, auth.user_id).await?))
}

/// POST /api/cart/lines
#[post("/cart/lines")]
pub async fn add_line(
    auth: JwtAuth,
    info: web::Json<AddLineReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if info.quantity < 1 {
        return Ok(HttpResponse::BadRequest().body("quantity must be at least 1"));
    }

    let product = product_repo::get(&db, info.product_id)
        .await?
        .ok_or(StoreError::NotFound)?;
    if product.stock < info.quantity {
        return Err(StoreError::InsufficientStock {
            product_id: product.id,
            title: product.title,
            available: product.stock,
            requested: info.quantity,
        }
        .into());
    }

    cart_repo::add_line(&db, auth.user_id, info.product_id, info.quantity).await?;
    Ok(HttpResponse::Ok().json(current_cart(&db, auth.user_id).await?))
}

/// PATCH /api/cart/lines/{id}
#[patch("/cart/lines/{id}")]
pub async fn update_line(
    auth: JwtAuth,
    path: web::Path<i64>,
    info: web::Json<UpdateLineReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if info.quantity < 1 {
        return Ok(HttpResponse::BadRequest().body("quantity must be at least 1"));
    }
    let line_id = path.into_inner();

    // Ownership check happens in the repo; a foreign line is a 404.
    let Some((_, lines)) = cart_repo::get_with_lines(&db, auth.user_id).await? else {
        return Err(StoreError::NotFound.into());
    };
    let line = lines
        .iter()
        .find(|l| l.id == line_id)
        .ok_or(StoreError::NotFound)?;

    if line.stock < info.quantity {
        return Err(StoreError::InsufficientStock {
            product_id: line.product_id,
            title: line.title.clone(),
            available: line.stock,
            requested: info.quantity,
        }
        .into());
    }

    cart_repo::update_line_quantity(&db, line_id, info.quantity, auth.user_id)
        .await?
        .ok_or(StoreError::NotFound)?;

    Ok(HttpResponse::Ok().json(current_cart(&db, auth.user_id).await?))
}

/// DELETE /api/cart/lines/{id}
#[delete("/cart/lines/{id}")]
pub async fn remove_line(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if cart_repo::remove_line(&db, path.into_inner(), auth.user_id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(StoreError::NotFound.into())
    }
}

/// DELETE /api/cart
#[delete("/cart")]
pub async fn clear_cart(
    auth: JwtAuth,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let mut conn = db.acquire().await.map_err(StoreError::Db)?;
    cart_repo::clear(&mut conn, auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_cart)
        .service(add_line)
        .service(update_line)
        .service(remove_line)
        .service(clear_cart);
}
