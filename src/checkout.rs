//! The checkout transaction: turns a user's cart into an immutable order
//! while enforcing stock invariants under concurrency.
//!
//! The algorithm is written once, against the `CheckoutStore` seam, and
//! runs over two implementations: Postgres inside a real transaction, and
//! an in-memory store with clone-and-swap commit semantics for tests.
//! Whatever the backend, a failure anywhere leaves the pre-checkout state
//! fully intact — no partial order, stock mutation, or cart clearing ever
//! survives.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::db::models::CartLineDetail;
use crate::db::{cart_repo, order_repo, product_repo};
use crate::error::StoreError;

/// Sales tax applied at order creation. Fixed at 10%.
fn tax_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// A cart line as seen under the checkout lock: quantity requested plus
/// the authoritative stock and price at this instant.
#[derive(Debug, Clone)]
pub struct LockedLine {
    pub line_id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: Decimal,
    pub stock: i32,
    pub quantity: i32,
}

impl From<CartLineDetail> for LockedLine {
    fn from(d: CartLineDetail) -> Self {
        LockedLine {
            line_id: d.id,
            product_id: d.product_id,
            title: d.title,
            unit_price: d.price,
            stock: d.stock,
            quantity: d.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineDraft {
    pub product_id: i64,
    pub quantity: i32,
    /// Price at time of purchase; the permanent snapshot.
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// A fully priced order, ready to persist. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDraft {
    pub user_id: i64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_ref: Option<String>,
    pub lines: Vec<OrderLineDraft>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Pricing rule: subtotal = Σ(quantity × unit price) and tax = subtotal ×
/// 10%, each rounded to 2 decimals independently before summing into the
/// total.
pub fn price_cart(lines: &[LockedLine]) -> Totals {
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        subtotal += Decimal::from(line.quantity) * line.unit_price;
    }
    let subtotal = subtotal.round_dp(2);
    let tax = (subtotal * tax_rate()).round_dp(2);
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Storage operations the checkout algorithm needs, all executing within
/// one atomic scope owned by the caller.
#[async_trait]
pub trait CheckoutStore {
    /// Locked read of the user's cart; `None` when no cart row exists.
    async fn lock_cart_lines(&mut self, user_id: i64)
        -> Result<Option<Vec<LockedLine>>, StoreError>;

    async fn insert_order(&mut self, draft: &OrderDraft) -> Result<i64, StoreError>;

    async fn decrement_stock(&mut self, product_id: i64, quantity: i32)
        -> Result<(), StoreError>;

    async fn clear_cart(&mut self, user_id: i64) -> Result<(), StoreError>;
}

/// The checkout algorithm. Runs within the caller's transactional scope;
/// the caller decides what commit and rollback mean.
///
/// 1. lock the cart; no lines → `EmptyCart`;
/// 2. re-check every line's stock under the lock; first shortfall →
///    `InsufficientStock` naming that product;
/// 3. price the cart and persist the order with per-line snapshots;
/// 4. decrement stock per line;
/// 5. clear the cart.
pub async fn run_checkout<S: CheckoutStore + Send>(
    store: &mut S,
    user_id: i64,
    payment_ref: Option<&str>,
) -> Result<i64, StoreError> {
    let lines = store
        .lock_cart_lines(user_id)
        .await?
        .unwrap_or_default();
    if lines.is_empty() {
        return Err(StoreError::EmptyCart);
    }

    for line in &lines {
        if line.stock < line.quantity {
            return Err(StoreError::InsufficientStock {
                product_id: line.product_id,
                title: line.title.clone(),
                available: line.stock,
                requested: line.quantity,
            });
        }
    }

    let totals = price_cart(&lines);
    let draft = OrderDraft {
        user_id,
        subtotal: totals.subtotal,
        tax: totals.tax,
        total: totals.total,
        payment_ref: payment_ref.map(str::to_owned),
        lines: lines
            .iter()
            .map(|l| OrderLineDraft {
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                subtotal: Decimal::from(l.quantity) * l.unit_price,
            })
            .collect(),
    };

    let order_id = store.insert_order(&draft).await?;

    for line in &lines {
        store.decrement_stock(line.product_id, line.quantity).await?;
    }

    store.clear_cart(user_id).await?;
    Ok(order_id)
}

/// Postgres-backed checkout store over a borrowed connection. The
/// enclosing transaction supplies atomicity: dropping it without a commit
/// rolls everything back.
pub struct PgCheckout<'a>(pub &'a mut PgConnection);

#[async_trait]
impl CheckoutStore for PgCheckout<'_> {
    async fn lock_cart_lines(
        &mut self,
        user_id: i64,
    ) -> Result<Option<Vec<LockedLine>>, StoreError> {
        let locked = cart_repo::lock_with_lines(self.0, user_id).await?;
        Ok(locked.map(|(_, lines)| lines.into_iter().map(LockedLine::from).collect()))
    }

    async fn insert_order(&mut self, draft: &OrderDraft) -> Result<i64, StoreError> {
        order_repo::insert(self.0, draft).await
    }

    async fn decrement_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
    ) -> Result<(), StoreError> {
        product_repo::decrement_stock(self.0, product_id, quantity).await?;
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: i64) -> Result<(), StoreError> {
        cart_repo::clear(self.0, user_id).await
    }
}

/// Checkout within a caller-supplied transaction scope. The caller
/// commits or rolls back.
pub async fn checkout_in(
    conn: &mut PgConnection,
    user_id: i64,
    payment_ref: Option<&str>,
) -> Result<i64, StoreError> {
    run_checkout(&mut PgCheckout(conn), user_id, payment_ref).await
}

/// Checkout as a self-contained unit of work: opens a transaction, runs
/// the algorithm, commits on success and rolls back on any failure.
pub async fn checkout(
    pool: &PgPool,
    user_id: i64,
    payment_ref: Option<&str>,
) -> Result<order_repo::OrderDetail, StoreError> {
    let mut tx = pool.begin().await?;

    let order_id = match checkout_in(&mut tx, user_id, payment_ref).await {
        Ok(id) => id,
        Err(e) => {
            tx.rollback().await.ok();
            return Err(e);
        }
    };

    tx.commit().await?;

    order_repo::get(pool, order_id, None)
        .await?
        .ok_or(StoreError::NotFound)
}

// ---------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct MemProduct {
    pub title: String,
    pub price: Decimal,
    pub stock: i32,
}

/// In-memory checkout store. `checkout` runs the shared algorithm against
/// a clone and swaps it in only on success, giving the same
/// all-or-nothing visibility as the Postgres transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub products: HashMap<i64, MemProduct>,
    carts: HashMap<i64, Vec<(i64, i64, i32)>>, // user -> (line_id, product_id, qty)
    pub orders: Vec<(i64, OrderDraft)>,
    next_line_id: i64,
    next_order_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_product(&mut self, product_id: i64, title: &str, price: Decimal, stock: i32) {
        self.products.insert(
            product_id,
            MemProduct {
                title: title.to_string(),
                price,
                stock,
            },
        );
    }

    /// Mirrors the dedup-on-add cart rule.
    pub fn add_to_cart(&mut self, user_id: i64, product_id: i64, quantity: i32) {
        let lines = self.carts.entry(user_id).or_default();
        if let Some(line) = lines.iter_mut().find(|(_, pid, _)| *pid == product_id) {
            line.2 += quantity;
            return;
        }
        self.next_line_id += 1;
        lines.push((self.next_line_id, product_id, quantity));
    }

    pub fn cart_lines(&self, user_id: i64) -> Vec<(i64, i64, i32)> {
        self.carts.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn stock_of(&self, product_id: i64) -> Option<i32> {
        self.products.get(&product_id).map(|p| p.stock)
    }

    /// Atomic checkout over the in-memory state.
    pub async fn checkout(
        &mut self,
        user_id: i64,
        payment_ref: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut staged = self.clone();
        let order_id = run_checkout(&mut staged, user_id, payment_ref).await?;
        *self = staged;
        Ok(order_id)
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn lock_cart_lines(
        &mut self,
        user_id: i64,
    ) -> Result<Option<Vec<LockedLine>>, StoreError> {
        let Some(lines) = self.carts.get(&user_id) else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(lines.len());
        for (line_id, product_id, quantity) in lines {
            let product = self.products.get(product_id).ok_or(StoreError::NotFound)?;
            out.push(LockedLine {
                line_id: *line_id,
                product_id: *product_id,
                title: product.title.clone(),
                unit_price: product.price,
                stock: product.stock,
                quantity: *quantity,
            });
        }
        Ok(Some(out))
    }

    async fn insert_order(&mut self, draft: &OrderDraft) -> Result<i64, StoreError> {
        self.next_order_id += 1;
        self.orders.push((self.next_order_id, draft.clone()));
        Ok(self.next_order_id)
    }

    async fn decrement_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
    ) -> Result<(), StoreError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::NotFound)?;
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                title: product.title.clone(),
                available: product.stock,
                requested: quantity,
            });
        }
        product.stock -= quantity;
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: i64) -> Result<(), StoreError> {
        self.carts.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, price: &str, qty: i32) -> LockedLine {
        LockedLine {
            line_id: product_id,
            product_id,
            title: format!("game {product_id}"),
            unit_price: price.parse().unwrap(),
            stock: i32::MAX,
            quantity: qty,
        }
    }

    #[test]
    fn pricing_is_deterministic() {
        // 59.99 × 2 + 39.99 → subtotal 159.97, tax 16.00, total 175.97
        let totals = price_cart(&[line(1, "59.99", 2), line(2, "39.99", 1)]);
        assert_eq!(totals.subtotal, "159.97".parse::<Decimal>().unwrap());
        assert_eq!(totals.tax, "16.00".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, "175.97".parse::<Decimal>().unwrap());
    }

    #[test]
    fn tax_rounds_independently_of_subtotal() {
        // subtotal 0.25, raw tax 0.025 rounds to 0.02 (banker's), total
        // sums the two rounded figures.
        let totals = price_cart(&[line(1, "0.25", 1)]);
        assert_eq!(totals.subtotal, "0.25".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        let totals = price_cart(&[]);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
