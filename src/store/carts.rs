//! Cart resolution and mutation.
//!
//! A cart belongs to exactly one of: a customer (at most one cart each,
//! enforced by a UNIQUE constraint) or an anonymous session, which holds
//! nothing but the cart's own id as an opaque token. Carts are created
//! lazily on the first add; empty leftovers are collected by
//! [`reap_empty_carts`].

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Cart, CartItem, CartLine};
use crate::{Result, StoreError};

/// The identity a cart request acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub enum CartIdentity {
    Customer(Uuid),
    /// Anonymous shopper, optionally holding the cart token from its session.
    Anonymous(Option<Uuid>),
}

#[derive(Debug)]
pub struct ResolvedCart {
    pub cart: Cart,
    /// True when the cart was created by this resolution. For anonymous
    /// identities the caller must report the new id back to its session
    /// (expected expiry: 7 days, caller-owned).
    pub created: bool,
}

/// Non-creating lookup used by read/update/remove paths.
///
/// A stale anonymous token (cart deleted, or re-bound to a customer at
/// login) resolves to `None`.
pub async fn find_cart(db: &PgPool, identity: CartIdentity) -> Result<Option<Cart>> {
    let cart = match identity {
        CartIdentity::Customer(customer_id) => {
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(db)
                .await?
        }
        CartIdentity::Anonymous(Some(cart_id)) => {
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE id = $1 AND customer_id IS NULL")
                .bind(cart_id)
                .fetch_optional(db)
                .await?
        }
        CartIdentity::Anonymous(None) => None,
    };
    Ok(cart)
}

/// Locate the identity's cart, creating one when it does not exist yet.
///
/// Two concurrent resolutions for a brand-new anonymous identity may race
/// and create two carts; the loser stays empty and is reaped later.
pub async fn resolve_cart(db: &PgPool, identity: CartIdentity) -> Result<ResolvedCart> {
    if let Some(cart) = find_cart(db, identity).await? {
        return Ok(ResolvedCart { cart, created: false });
    }

    let cart = match identity {
        CartIdentity::Customer(customer_id) => {
            // Concurrent creation for the same customer loses the UNIQUE
            // race; fall back to the winner's cart.
            let inserted = sqlx::query_as::<_, Cart>(
                "INSERT INTO carts (id, customer_id) VALUES ($1, $2)
                 ON CONFLICT (customer_id) DO NOTHING RETURNING *",
            )
            .bind(Uuid::now_v7())
            .bind(customer_id)
            .fetch_optional(db)
            .await?;
            match inserted {
                Some(cart) => cart,
                None => {
                    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE customer_id = $1")
                        .bind(customer_id)
                        .fetch_one(db)
                        .await?
                }
            }
        }
        CartIdentity::Anonymous(_) => {
            sqlx::query_as::<_, Cart>("INSERT INTO carts (id) VALUES ($1) RETURNING *")
                .bind(Uuid::now_v7())
                .fetch_one(db)
                .await?
        }
    };

    Ok(ResolvedCart { cart, created: true })
}

/// Resulting line quantity if adding `requested` on top of `existing` stays
/// within `inventory`; `None` when the total would exceed it.
pub(crate) fn combined_line_quantity(existing: i32, requested: i32, inventory: i32) -> Option<i32> {
    let combined = existing.saturating_add(requested);
    (combined <= inventory).then_some(combined)
}

/// Add `quantity` of a product to the cart. An existing line for the same
/// product absorbs the quantity instead of duplicating the line.
///
/// The ceiling check reads inventory outside any transaction and is
/// advisory only; the authoritative check runs again at checkout under row
/// locks.
pub async fn add_item(
    db: &PgPool,
    cart: &Cart,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartItem> {
    if quantity < 1 {
        return Err(StoreError::InvalidQuantity);
    }

    let product = sqlx::query_as::<_, (String, i32)>(
        "SELECT title, inventory FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(db)
    .await?
    .ok_or(StoreError::NotFound("product"))?;

    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2",
    )
    .bind(cart.id)
    .bind(product_id)
    .fetch_optional(db)
    .await?
    .unwrap_or(0);

    combined_line_quantity(existing, quantity, product.1)
        .ok_or(StoreError::InsufficientInventory { product: product.0 })?;

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4)
         ON CONFLICT (cart_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(cart.id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(db)
    .await?;

    tracing::debug!(cart_id = %cart.id, product_id = %product_id, quantity, "cart line added");
    Ok(item)
}

/// Replace a line's quantity. Subject to the same advisory ceiling as
/// [`add_item`], against the replacement quantity alone.
pub async fn update_quantity(
    db: &PgPool,
    cart: &Cart,
    item_id: Uuid,
    quantity: i32,
) -> Result<CartItem> {
    if quantity < 1 {
        return Err(StoreError::InvalidQuantity);
    }

    let item = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE id = $1 AND cart_id = $2",
    )
    .bind(item_id)
    .bind(cart.id)
    .fetch_optional(db)
    .await?
    .ok_or(StoreError::NotFound("cart item"))?;

    let product = sqlx::query_as::<_, (String, i32)>(
        "SELECT title, inventory FROM products WHERE id = $1",
    )
    .bind(item.product_id)
    .fetch_optional(db)
    .await?
    .ok_or(StoreError::NotFound("product"))?;

    if quantity > product.1 {
        return Err(StoreError::InsufficientInventory { product: product.0 });
    }

    let updated = sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $2 WHERE id = $1 RETURNING *",
    )
    .bind(item_id)
    .bind(quantity)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn remove_item(db: &PgPool, cart: &Cart, item_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id)
        .bind(cart.id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("cart item"));
    }
    Ok(())
}

/// Line items of a cart joined with their product's current title and price.
pub async fn cart_lines(db: &PgPool, cart_id: Uuid) -> Result<Vec<CartLine>> {
    let lines = sqlx::query_as::<_, CartLine>(
        "SELECT ci.id, ci.product_id, p.title, p.price AS unit_price, ci.quantity
         FROM cart_items ci
         JOIN products p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY ci.created_at",
    )
    .bind(cart_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

/// Delete carts holding zero line items. Called from the periodic
/// maintenance loop; also mops up losers of the anonymous creation race.
pub async fn reap_empty_carts(db: &PgPool) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM carts c
         WHERE NOT EXISTS (SELECT 1 FROM cart_items ci WHERE ci.cart_id = c.id)",
    )
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_allows_up_to_inventory() {
        assert_eq!(combined_line_quantity(0, 3, 5), Some(3));
        assert_eq!(combined_line_quantity(3, 2, 5), Some(5));
    }

    #[test]
    fn ceiling_rejects_when_total_exceeds_inventory() {
        // 3 in the cart, 3 more requested, 5 in stock: the line stays at 3.
        assert_eq!(combined_line_quantity(3, 3, 5), None);
        assert_eq!(combined_line_quantity(0, 1, 0), None);
    }

    #[test]
    fn ceiling_does_not_overflow() {
        assert_eq!(combined_line_quantity(i32::MAX, 1, i32::MAX), Some(i32::MAX));
    }
}
