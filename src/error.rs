//! Service-level error taxonomy and its HTTP mapping.
//!
//! Business-rule violations are recovered at the handler boundary and
//! translated into client-facing responses carrying enough context (ids,
//! quantities) to act on. Storage connectivity loss is the only thing that
//! surfaces as a 500, and its internals never leak into the body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock for {title}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        title: String,
        available: i32,
        requested: i32,
    },

    /// Used uniformly for "does not exist" and "exists but not yours":
    /// the two must be indistinguishable to the caller.
    #[error("not found")]
    NotFound,

    #[error("product with external id {0} already exists")]
    DuplicateExternalId(i64),

    #[error("you have already reviewed product {0}")]
    DuplicateReview(i64),

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("product is referenced by existing orders and cannot be deleted")]
    ProductInUse,

    #[error("invalid credentials")]
    Unauthorized,

    #[error("admin privileges required")]
    Forbidden,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::EmptyCart => StatusCode::BAD_REQUEST,
            StoreError::InsufficientStock { .. } => StatusCode::CONFLICT,
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::DuplicateExternalId(_)
            | StoreError::DuplicateReview(_)
            | StoreError::DuplicateEmail
            | StoreError::ProductInUse => StatusCode::CONFLICT,
            StoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden => StatusCode::FORBIDDEN,
            StoreError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            StoreError::Db(e) => {
                log::error!("database error: {e:?}");
                json!({ "error": "internal server error" })
            }
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => json!({
                "error": self.to_string(),
                "product_id": product_id,
                "available": available,
                "requested": requested,
            }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Maps a Postgres unique-violation on the given constraint to `mapped`,
/// passing every other error through as `StoreError::Db`.
pub fn on_unique_violation(err: sqlx::Error, constraint: &str, mapped: StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505")
            && db.constraint().map_or(true, |c| c.contains(constraint))
        {
            return mapped;
        }
    }
    StoreError::Db(err)
}

/// Maps a Postgres foreign-key restrict violation (23503) to `mapped`.
pub fn on_fk_violation(err: sqlx::Error, mapped: StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23503") {
            return mapped;
        }
    }
    StoreError::Db(err)
}
