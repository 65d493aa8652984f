//! Integration tests against a real Postgres instance.
//!
//! Ignored by default; run with a migrated database:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```
//!
//! Each test seeds its own user/product rows with fresh identifiers, so
//! the suite can run repeatedly against the same database.

use memorycard_server::checkout;
use memorycard_server::db::models::{Product, User};
use memorycard_server::db::{cart_repo, order_repo, product_repo, review_repo, user_repo};
use memorycard_server::error::StoreError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn connect() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPool::connect(&url).await.expect("postgres connection")
}

async fn seed_user(pool: &PgPool) -> User {
    let email = format!("test-{}@example.test", Uuid::new_v4());
    user_repo::create(pool, &email, "Test Shopper", "not-a-real-hash")
        .await
        .expect("seed user")
}

async fn seed_product(pool: &PgPool, price: &str, stock: i32) -> Product {
    // rawg_id is UNIQUE; derive a random positive id per test run.
    let rawg_id = (Uuid::new_v4().as_u128() % i64::MAX as u128) as i64;
    let new = product_repo::NewProduct {
        rawg_id,
        price: price.parse::<Decimal>().unwrap(),
        stock,
    };
    let meta = product_repo::RawgMetadata {
        title: format!("Test Game {rawg_id}"),
        slug: format!("test-game-{rawg_id}"),
        description: None,
        image_url: None,
    };
    product_repo::create(pool, &new, &meta).await.expect("seed product")
}

#[tokio::test]
#[ignore]
async fn checkout_commits_order_stock_and_cart_together() {
    let pool = connect().await;
    let user = seed_user(&pool).await;
    let product = seed_product(&pool, "59.99", 10).await;

    cart_repo::add_line(&pool, user.id, product.id, 2)
        .await
        .unwrap();

    let detail = checkout::checkout(&pool, user.id, Some("pi_itest"))
        .await
        .unwrap();

    assert_eq!(detail.order.user_id, user.id);
    assert_eq!(detail.order.subtotal, "119.98".parse::<Decimal>().unwrap());
    assert_eq!(detail.order.tax, "12.00".parse::<Decimal>().unwrap());
    assert_eq!(detail.order.total, "131.98".parse::<Decimal>().unwrap());
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].quantity, 2);

    let product = product_repo::get(&pool, product.id).await.unwrap().unwrap();
    assert_eq!(product.stock, 8);

    let (_, lines) = cart_repo::get_with_lines(&pool, user.id)
        .await
        .unwrap()
        .expect("cart row survives clearing");
    assert!(lines.is_empty());
}

#[tokio::test]
#[ignore]
async fn failed_checkout_leaves_no_trace_in_postgres() {
    let pool = connect().await;
    let user = seed_user(&pool).await;
    let in_stock = seed_product(&pool, "19.99", 5).await;
    let scarce = seed_product(&pool, "29.99", 1).await;

    cart_repo::add_line(&pool, user.id, in_stock.id, 2).await.unwrap();
    cart_repo::add_line(&pool, user.id, scarce.id, 3).await.unwrap();

    let err = checkout::checkout(&pool, user.id, None).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { .. }));

    // The whole transaction rolled back: stock and cart untouched, no order.
    let p1 = product_repo::get(&pool, in_stock.id).await.unwrap().unwrap();
    let p2 = product_repo::get(&pool, scarce.id).await.unwrap().unwrap();
    assert_eq!(p1.stock, 5);
    assert_eq!(p2.stock, 1);

    let (_, lines) = cart_repo::get_with_lines(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(lines.len(), 2);

    let (orders, total) = order_repo::list_by_user(&pool, user.id, 1, 10).await.unwrap();
    assert!(orders.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
#[ignore]
async fn another_users_order_reads_as_nonexistent() {
    let pool = connect().await;
    let alice = seed_user(&pool).await;
    let bob = seed_user(&pool).await;
    let product = seed_product(&pool, "9.99", 3).await;

    cart_repo::add_line(&pool, alice.id, product.id, 1).await.unwrap();
    let detail = checkout::checkout(&pool, alice.id, None).await.unwrap();

    let as_bob = order_repo::get(&pool, detail.order.id, Some(bob.id))
        .await
        .unwrap();
    assert!(as_bob.is_none());

    // The owner and an unscoped (admin) read both still see it.
    assert!(order_repo::get(&pool, detail.order.id, Some(alice.id))
        .await
        .unwrap()
        .is_some());
    assert!(order_repo::get(&pool, detail.order.id, None)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore]
async fn second_review_of_the_same_product_is_rejected() {
    let pool = connect().await;
    let user = seed_user(&pool).await;
    let product = seed_product(&pool, "49.99", 2).await;

    review_repo::create(&pool, user.id, product.id, 5, Some("instant classic"))
        .await
        .unwrap();

    let err = review_repo::create(&pool, user.id, product.id, 3, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateReview(_)));

    let (rows, total, average) = review_repo::list_by_product(&pool, product.id, 1, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(total, 1);
    assert_eq!(average, Some(5.0));
}

#[tokio::test]
#[ignore]
async fn product_referenced_by_an_order_cannot_be_deleted() {
    let pool = connect().await;
    let user = seed_user(&pool).await;
    let product = seed_product(&pool, "14.99", 4).await;

    cart_repo::add_line(&pool, user.id, product.id, 1).await.unwrap();
    checkout::checkout(&pool, user.id, None).await.unwrap();

    let err = product_repo::delete(&pool, product.id).await.unwrap_err();
    assert!(matches!(err, StoreError::ProductInUse));
}
