//! Checkout: atomic conversion of a cart into an immutable order.
//!
//! Everything runs inside one transaction: re-validate stock under row
//! locks, insert the order, snapshot line prices, decrement inventory,
//! delete the cart. A failure at any step rolls the whole thing back.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Customer, Order, OrderItem};
use crate::{Result, StoreError};

/// A cart line joined with the product state read inside the checkout
/// transaction.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PricedLine {
    pub product_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub available: i32,
}

#[derive(Debug)]
pub(crate) struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl PlacedOrder {
    pub fn total(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.unit_price * i64::from(i.quantity))
            .sum()
    }
}

/// Validate every line against the inventory read in this transaction and
/// freeze its price. The first violation fails the whole checkout; no
/// partial order is ever produced.
pub(crate) fn snapshot_lines(lines: &[PricedLine]) -> Result<Vec<OrderLine>> {
    if lines.is_empty() {
        return Err(StoreError::EmptyCart);
    }
    lines
        .iter()
        .map(|line| {
            if line.quantity > line.available {
                return Err(StoreError::InsufficientInventory {
                    product: line.title.clone(),
                });
            }
            Ok(OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
        })
        .collect()
}

fn order_number() -> String {
    format!("ORD-{:08}", rand::random::<u32>())
}

/// Convert the user's cart into an order.
///
/// The cart row is locked first, so of two concurrent checkouts of the same
/// cart one wins and the other finds the cart gone and fails with
/// `EmptyCart`. Product rows are locked before re-validation, which makes
/// the decrement safe against concurrent checkouts of other carts holding
/// the same products.
pub async fn checkout(db: &PgPool, user_id: Uuid) -> Result<PlacedOrder> {
    let mut tx = db.begin().await?;

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NoCustomer)?;

    let cart_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM carts WHERE customer_id = $1 FOR UPDATE",
    )
    .bind(customer.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::EmptyCart)?;

    // Ordered by product id so concurrent checkouts take product locks in a
    // consistent order.
    let lines = sqlx::query_as::<_, PricedLine>(
        "SELECT ci.product_id, p.title, ci.quantity, p.price AS unit_price,
                p.inventory AS available
         FROM cart_items ci
         JOIN products p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY p.id
         FOR UPDATE OF p",
    )
    .bind(cart_id)
    .fetch_all(&mut *tx)
    .await?;

    let snapshot = snapshot_lines(&lines)?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, customer_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(order_number())
    .bind(customer.id)
    .fetch_one(&mut *tx)
    .await?;

    let ids: Vec<Uuid> = snapshot.iter().map(|_| Uuid::now_v7()).collect();
    let product_ids: Vec<Uuid> = snapshot.iter().map(|l| l.product_id).collect();
    let quantities: Vec<i32> = snapshot.iter().map(|l| l.quantity).collect();
    let prices: Vec<i64> = snapshot.iter().map(|l| l.unit_price).collect();

    let items = sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
         SELECT t.id, $1, t.product_id, t.quantity, t.unit_price
         FROM UNNEST($2::uuid[], $3::uuid[], $4::int[], $5::bigint[])
              AS t(id, product_id, quantity, unit_price)
         RETURNING *",
    )
    .bind(order.id)
    .bind(&ids)
    .bind(&product_ids)
    .bind(&quantities)
    .bind(&prices)
    .fetch_all(&mut *tx)
    .await?;

    for line in &snapshot {
        sqlx::query(
            "UPDATE products SET inventory = inventory - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
    }

    // Cascades to the cart's line items.
    sqlx::query("DELETE FROM carts WHERE id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(order_id = %order.id, customer_id = %customer.id, "order placed");
    Ok(PlacedOrder { order, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(title: &str, quantity: i32, unit_price: i64, available: i32) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            title: title.into(),
            quantity,
            unit_price,
            available,
        }
    }

    #[test]
    fn empty_cart_places_no_order() {
        assert!(matches!(snapshot_lines(&[]), Err(StoreError::EmptyCart)));
    }

    #[test]
    fn oversold_line_fails_whole_checkout_and_names_product() {
        let lines = vec![line("Widget", 2, 100, 5), line("Gadget", 6, 250, 5)];
        match snapshot_lines(&lines) {
            Err(StoreError::InsufficientInventory { product }) => assert_eq!(product, "Gadget"),
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_freezes_current_prices() {
        let lines = vec![line("Widget", 2, 100, 5)];
        let snapshot = snapshot_lines(&lines).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].unit_price, 100);
        assert_eq!(snapshot[0].quantity, 2);
    }

    #[test]
    fn quantity_equal_to_inventory_is_allowed() {
        let lines = vec![line("Widget", 5, 100, 5)];
        assert!(snapshot_lines(&lines).is_ok());
    }

    #[test]
    fn placed_order_total_sums_frozen_lines() {
        let order = PlacedOrder {
            order: Order {
                id: Uuid::new_v4(),
                order_number: "ORD-00000001".into(),
                customer_id: Uuid::new_v4(),
                payment_status: "pending".into(),
                placed_at: chrono::Utc::now(),
            },
            items: vec![
                OrderItem {
                    id: Uuid::new_v4(),
                    order_id: Uuid::new_v4(),
                    product_id: Uuid::new_v4(),
                    quantity: 2,
                    unit_price: 100,
                },
                OrderItem {
                    id: Uuid::new_v4(),
                    order_id: Uuid::new_v4(),
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: 250,
                },
            ],
        };
        assert_eq!(order.total(), 450);
    }
}
