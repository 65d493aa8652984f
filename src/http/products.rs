//! Storefront product endpoints. Creation pulls metadata from RAWG once
//! (through the cache) and freezes it as the local snapshot; the detail
//! endpoint re-enriches from RAWG but falls back to that snapshot when
//! the provider is unavailable.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::catalog::CatalogService;
use crate::db::models::Product;
use crate::db::product_repo::{self, NewProduct, RawgMetadata, UpdateProduct};
use crate::error::StoreError;
use crate::http::auth::JwtAuth;
use crate::rawg::types::{Genre, PlatformRef};

#[derive(Deserialize)]
pub struct CreateProductReq {
    pub rawg_id: i64,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Deserialize)]
pub struct UpdateProductReq {
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub in_stock_only: bool,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}

#[derive(Serialize)]
pub struct ProductPage {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<Product>,
}

/// Local product joined with (cached) upstream metadata. When RAWG is
/// down, everything upstream-only is simply absent.
#[derive(Serialize)]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub in_stock: bool,
    pub rating: Option<f64>,
    pub released: Option<String>,
    pub genres: Vec<Genre>,
    pub platforms: Vec<PlatformRef>,
}

/// GET /api/products
#[get("/products")]
pub async fn list_products(
    query: web::Query<ListQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let (results, total) =
        product_repo::list(&db, query.page, query.page_size, query.in_stock_only).await?;
    Ok(HttpResponse::Ok().json(ProductPage {
        total,
        page: query.page,
        page_size: query.page_size,
        results,
    }))
}

/// GET /api/products/{id}
#[get("/products/{id}")]
pub async fn get_product(
    path: web::Path<i64>,
    db: web::Data<PgPool>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    let product = product_repo::get(&db, path.into_inner())
        .await?
        .ok_or(StoreError::NotFound)?;

    let enriched = match catalog.game_details(product.rawg_id).await {
        Ok(detail) => EnrichedProduct {
            in_stock: product.stock > 0,
            rating: detail.rating,
            released: detail.released,
            genres: detail.genres,
            platforms: detail.platforms.into_iter().map(|p| p.platform).collect(),
            product,
        },
        // The catalog is never load-bearing for local reads.
        Err(e) => {
            log::warn!("enrichment unavailable, serving local snapshot: {e}");
            EnrichedProduct {
                in_stock: product.stock > 0,
                rating: None,
                released: None,
                genres: Vec::new(),
                platforms: Vec::new(),
                product,
            }
        }
    };

    Ok(HttpResponse::Ok().json(enriched))
}

/// POST /api/products  (admin)
#[post("/products")]
pub async fn create_product(
    auth: JwtAuth,
    info: web::Json<CreateProductReq>,
    db: web::Data<PgPool>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    if info.price <= Decimal::ZERO {
        return Ok(HttpResponse::BadRequest().body("price must be positive"));
    }
    if info.stock < 0 {
        return Ok(HttpResponse::BadRequest().body("stock must not be negative"));
    }

    // Reject duplicates before spending an upstream call.
    if let Some(existing) = product_repo::get_by_rawg_id(&db, info.rawg_id).await? {
        return Err(StoreError::DuplicateExternalId(existing.rawg_id).into());
    }

    let detail = catalog.game_details(info.rawg_id).await?;
    let meta = RawgMetadata {
        title: detail.name,
        slug: detail.slug,
        description: detail.description_raw,
        image_url: detail.background_image,
    };

    let product = product_repo::create(
        &db,
        &NewProduct {
            rawg_id: info.rawg_id,
            price: info.price,
            stock: info.stock,
        },
        &meta,
    )
    .await?;

    Ok(HttpResponse::Created().json(product))
}

/// PATCH /api/products/{id}  (admin)
#[patch("/products/{id}")]
pub async fn update_product(
    auth: JwtAuth,
    path: web::Path<i64>,
    info: web::Json<UpdateProductReq>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    if matches!(info.price, Some(p) if p <= Decimal::ZERO) {
        return Ok(HttpResponse::BadRequest().body("price must be positive"));
    }
    if matches!(info.stock, Some(s) if s < 0) {
        return Ok(HttpResponse::BadRequest().body("stock must not be negative"));
    }

    let changes = UpdateProduct {
        price: info.price,
        stock: info.stock,
        description: info.description.clone(),
    };
    let product = product_repo::update(&db, path.into_inner(), &changes)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(HttpResponse::Ok().json(product))
}

/// DELETE /api/products/{id}  (admin)
#[delete("/products/{id}")]
pub async fn delete_product(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    if product_repo::delete(&db, path.into_inner()).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(StoreError::NotFound.into())
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_products)
        .service(get_product)
        .service(create_product)
        .service(update_product)
        .service(delete_product);
}
