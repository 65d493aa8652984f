//! Password authentication (JWT access tokens + Redis-backed refresh).

use actix_web::{post, web, HttpResponse};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

use crate::config::settings;
use crate::db::user_repo;
use crate::error::StoreError;

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id
    adm: bool,   // admin flag
    exp: usize,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

//////////////////////////////////////////////////
// ─────────────  JwtAuth extractor  ─────────────
//////////////////////////////////////////////////

pub mod extractor {
    use super::Claims;
    use actix_web::{
        dev::Payload, error::ErrorUnauthorized, FromRequest, HttpRequest, Result as ActixResult,
    };
    use futures_util::future::{ready, Ready};
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use std::env;

    /// Extracts and validates a Bearer-JWT, exposing the authenticated
    /// user id and the admin flag. Handlers trust this identity.
    #[derive(Debug, Clone)]
    pub struct JwtAuth {
        pub user_id: i64,
        pub is_admin: bool,
    }

    impl FromRequest for JwtAuth {
        type Error = actix_web::Error;
        type Future = Ready<ActixResult<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
            let res = (|| {
                // Expect:  Authorization: Bearer <JWT>
                let hdr = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ErrorUnauthorized("missing Authorization header"))?;

                let token = hdr
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| ErrorUnauthorized("malformed Authorization header"))?;

                let secret =
                    env::var("JWT_SECRET").map_err(|_| ErrorUnauthorized("server mis-config"))?;
                let data = decode::<Claims>(
                    token,
                    &DecodingKey::from_secret(secret.as_bytes()),
                    &Validation::default(),
                )
                .map_err(|_| ErrorUnauthorized("invalid / expired token"))?;

                let user_id: i64 = data
                    .claims
                    .sub
                    .parse()
                    .map_err(|_| ErrorUnauthorized("bad sub"))?;

                Ok(JwtAuth {
                    user_id,
                    is_admin: data.claims.adm,
                })
            })();

            ready(res)
        }
    }
}
pub use extractor::JwtAuth;

fn issue_access_token(user_id: i64, is_admin: bool) -> Result<(String, i64), actix_web::Error> {
    let secret = env::var("JWT_SECRET")
        .map_err(|_| actix_web::error::ErrorInternalServerError("JWT_SECRET must be set"))?;
    let lifetime_secs = settings().access_token_minutes * 60;
    let exp = Utc::now()
        .checked_add_signed(Duration::seconds(lifetime_secs))
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("clock overflow"))?
        .timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        adm: is_admin,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok((token, lifetime_secs))
}

/// Mints a refresh token and parks it in Redis for the configured number
/// of days.
async fn mint_refresh_token(
    redis: &RedisClient,
    user_id: i64,
) -> Result<String, actix_web::Error> {
    let refresh_token = Uuid::new_v4().to_string();
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let key = format!("refresh:{refresh_token}");
    let ttl = (settings().refresh_token_days * 24 * 3_600) as u64;
    conn.set_ex::<_, _, ()>(&key, user_id.to_string(), ttl)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(refresh_token)
}

//////////////////////////////////////////////////
// POST /api/auth/register
//////////////////////////////////////////////////
#[post("/auth/register")]
pub async fn register(
    info: web::Json<RegisterRequest>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, actix_web::Error> {
    if info.password.len() < 8 {
        return Ok(HttpResponse::BadRequest().body("password must be at least 8 characters"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(info.password.as_bytes(), &salt)
        .map_err(actix_web::error::ErrorInternalServerError)?
        .to_string();

    let user = user_repo::create(&db, &info.email, &info.full_name, &hash).await?;

    let (access_token, expires_in) = issue_access_token(user.id, user.is_admin)?;
    let refresh_token = mint_refresh_token(&redis, user.id).await?;

    Ok(HttpResponse::Created().json(TokenResponse {
        access_token,
        refresh_token,
        expires_in,
    }))
}

//////////////////////////////////////////////////
// POST /api/auth/login
//////////////////////////////////////////////////
#[post("/auth/login")]
pub async fn login(
    info: web::Json<LoginRequest>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = user_repo::get_by_email(&db, &info.email)
        .await?
        .ok_or(StoreError::Unauthorized)?;

    let parsed =
        PasswordHash::new(&user.password_hash).map_err(|_| StoreError::Unauthorized)?;
    Argon2::default()
        .verify_password(info.password.as_bytes(), &parsed)
        .map_err(|_| StoreError::Unauthorized)?;

    let (access_token, expires_in) = issue_access_token(user.id, user.is_admin)?;
    let refresh_token = mint_refresh_token(&redis, user.id).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token,
        expires_in,
    }))
}

//////////////////////////////////////////////////
// POST /api/auth/refresh
//////////////////////////////////////////////////
#[post("/auth/refresh")]
pub async fn refresh(
    info: web::Json<RefreshRequest>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, actix_web::Error> {
    // 1) consume old refresh → user_id
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let key = format!("refresh:{}", info.refresh_token);
    let user_id_str: Option<String> = conn
        .get(&key)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let Some(user_id_str) = user_id_str else {
        return Ok(HttpResponse::Unauthorized().body("invalid refresh"));
    };
    conn.del::<_, ()>(&key).await.unwrap_or(());

    let user_id: i64 = user_id_str
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("corrupt refresh entry"))?;

    // 2) the admin flag may have changed since the last issue
    let user = user_repo::get(&db, user_id)
        .await?
        .ok_or(StoreError::Unauthorized)?;

    // 3) new token pair
    let (access_token, expires_in) = issue_access_token(user.id, user.is_admin)?;
    let refresh_token = mint_refresh_token(&redis, user.id).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token,
        expires_in,
    }))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(refresh);
}
