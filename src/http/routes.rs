use crate::http;
use actix_web::web;

/// Mount every HTTP sub-module under `/api`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(http::auth::init_routes)
            .configure(http::products::init_routes)
            .configure(http::catalog::init_routes)
            .configure(http::cart::init_routes)
            .configure(http::orders::init_routes)
            .configure(http::reviews::init_routes)
            .configure(http::health::init_routes),
    );
}
