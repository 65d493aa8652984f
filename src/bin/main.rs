use actix_web::{middleware::Logger, web, App, HttpServer};
use memorycard_server::catalog::{CacheService, CatalogService};
use memorycard_server::rawg::{HttpTransport, RawgClient};
use memorycard_server::{cache, config, http, metrics};
use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Configuration
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
    let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());
    let settings = config::settings();

    // Postgres pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to create Postgres pool");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    // Redis client
    let redis_client = RedisClient::open(redis_url.as_str()).expect("Invalid REDIS_URL");

    // Catalog proxy: explicitly constructed, owned here for the process
    // lifetime and injected into the handlers.
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(settings.rawg_timeout)));
    let rawg = RawgClient::new(settings, transport);
    let cache_store = Arc::new(cache::RedisCacheStore::new(redis_client.clone()));
    let cache_service = CacheService::new(cache_store, settings.cache_default_ttl);
    let catalog = web::Data::new(CatalogService::new(rawg, cache_service, settings));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(redis_client.clone()))
            .app_data(catalog.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
