//! Checkout properties over the in-memory store: atomicity, the stock
//! invariant, and point-in-time price snapshots.

use memorycard_server::checkout::MemoryStore;
use memorycard_server::error::StoreError;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.seed_product(1, "Chrono Drift", dec("59.99"), 10);
    store.seed_product(2, "Pixel Harvest", dec("39.99"), 5);
    store
}

#[tokio::test]
async fn checkout_creates_order_decrements_stock_and_clears_cart() {
    let mut store = seeded_store();
    store.add_to_cart(7, 1, 2);
    store.add_to_cart(7, 2, 1);

    let order_id = store.checkout(7, Some("pi_test_123")).await.unwrap();

    let (id, draft) = &store.orders[0];
    assert_eq!(*id, order_id);
    assert_eq!(draft.user_id, 7);
    assert_eq!(draft.subtotal, dec("159.97"));
    assert_eq!(draft.tax, dec("16.00"));
    assert_eq!(draft.total, dec("175.97"));
    assert_eq!(draft.payment_ref.as_deref(), Some("pi_test_123"));
    assert_eq!(draft.lines.len(), 2);

    assert_eq!(store.stock_of(1), Some(8));
    assert_eq!(store.stock_of(2), Some(4));
    assert!(store.cart_lines(7).is_empty());
}

#[tokio::test]
async fn empty_cart_aborts_with_no_side_effects() {
    let mut store = seeded_store();

    let err = store.checkout(7, None).await.unwrap_err();
    assert!(matches!(err, StoreError::EmptyCart));
    assert!(store.orders.is_empty());
    assert_eq!(store.stock_of(1), Some(10));
}

#[tokio::test]
async fn second_checkout_of_same_cart_finds_it_empty() {
    let mut store = seeded_store();
    store.add_to_cart(7, 1, 1);

    store.checkout(7, None).await.unwrap();
    let err = store.checkout(7, None).await.unwrap_err();

    assert!(matches!(err, StoreError::EmptyCart));
    assert_eq!(store.orders.len(), 1);
    assert_eq!(store.stock_of(1), Some(9));
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() {
    let mut store = seeded_store();
    store.add_to_cart(7, 1, 2); // fine
    store.add_to_cart(7, 2, 6); // only 5 in stock

    let err = store.checkout(7, None).await.unwrap_err();

    match err {
        StoreError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        } => {
            assert_eq!(product_id, 2);
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Total rollback: no order, no stock movement, cart untouched.
    assert!(store.orders.is_empty());
    assert_eq!(store.stock_of(1), Some(10));
    assert_eq!(store.stock_of(2), Some(5));
    assert_eq!(store.cart_lines(7).len(), 2);
}

#[tokio::test]
async fn contending_checkouts_never_oversell_the_last_unit() {
    let mut store = MemoryStore::new();
    store.seed_product(1, "Last Copy", dec("19.99"), 1);
    store.add_to_cart(1, 1, 1);
    store.add_to_cart(2, 1, 1);

    store.checkout(1, None).await.unwrap();
    let err = store.checkout(2, None).await.unwrap_err();

    assert!(matches!(err, StoreError::InsufficientStock { .. }));
    assert_eq!(store.stock_of(1), Some(0));
    assert_eq!(store.orders.len(), 1);
    // The loser's cart survives for a later retry.
    assert_eq!(store.cart_lines(2).len(), 1);
}

#[tokio::test]
async fn order_lines_snapshot_the_purchase_price() {
    let mut store = seeded_store();
    store.add_to_cart(7, 1, 1);
    store.checkout(7, None).await.unwrap();

    // A later price hike must not touch the recorded order.
    store.products.get_mut(&1).unwrap().price = dec("79.99");

    let (_, draft) = &store.orders[0];
    assert_eq!(draft.lines[0].unit_price, dec("59.99"));
    assert_eq!(draft.lines[0].subtotal, dec("59.99"));
}

#[tokio::test]
async fn readding_a_product_merges_into_one_line() {
    let mut store = seeded_store();
    store.add_to_cart(7, 1, 1);
    store.add_to_cart(7, 1, 2);

    let lines = store.cart_lines(7);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].2, 3);
}
