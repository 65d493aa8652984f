//! Proxied RAWG catalog endpoints. Every read goes through the
//! cache-aside service; admin cache busting lives here too.

use actix_web::{delete, get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::CatalogService;
use crate::error::StoreError;
use crate::http::auth::JwtAuth;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub genres: Option<String>,
    pub platforms: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}

#[derive(Deserialize)]
pub struct InvalidateQuery {
    pub prefix: String,
}

/// GET /api/catalog/search
#[get("/catalog/search")]
pub async fn search(
    query: web::Query<SearchQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    let page = catalog
        .search_games(
            &query.query,
            query.page,
            query.page_size,
            query.genres.as_deref(),
            query.platforms.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/catalog/games/{rawg_id}
#[get("/catalog/games/{rawg_id}")]
pub async fn game_details(
    path: web::Path<i64>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    let detail = catalog.game_details(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// GET /api/catalog/genres
#[get("/catalog/genres")]
pub async fn genres(
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    Ok(HttpResponse::Ok().json(catalog.list_genres().await?))
}

/// GET /api/catalog/platforms
#[get("/catalog/platforms")]
pub async fn platforms(
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    Ok(HttpResponse::Ok().json(catalog.list_platforms().await?))
}

/// DELETE /api/catalog/cache?prefix=catalog:search:  (admin)
#[delete("/catalog/cache")]
pub async fn invalidate_cache(
    auth: JwtAuth,
    query: web::Query<InvalidateQuery>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, actix_web::Error> {
    if !auth.is_admin {
        return Err(StoreError::Forbidden.into());
    }
    let removed = catalog.invalidate_by_prefix(&query.prefix).await;
    Ok(HttpResponse::Ok().json(json!({ "invalidated": removed })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(search)
        .service(game_details)
        .service(genres)
        .service(platforms)
        .service(invalidate_cache);
}
