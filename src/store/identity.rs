//! Account lifecycle hooks: customer creation at registration and cart
//! reconciliation at login.
//!
//! Both are plain functions the external identity service calls through the
//! auth hook routes; there is no event bus in between.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Cart, CartItem, Customer};
use crate::{Result, StoreError};

/// Post-registration hook: every non-staff user gets a customer profile.
/// Idempotent; staff users get none and `None` is returned.
pub async fn ensure_customer(
    db: &PgPool,
    user_id: Uuid,
    is_staff: bool,
) -> Result<Option<Customer>> {
    if is_staff {
        return Ok(None);
    }

    let inserted = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (id, user_id) VALUES ($1, $2)
         ON CONFLICT (user_id) DO NOTHING RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    let customer = match inserted {
        Some(customer) => customer,
        None => {
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(db)
                .await?
        }
    };
    Ok(Some(customer))
}

/// One step of a cart merge.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum MergeAction {
    /// Both carts hold the product: the customer line absorbs the summed
    /// quantity and the session line is dropped.
    Fold {
        target: Uuid,
        source: Uuid,
        quantity: i32,
    },
    /// Only the session cart holds the product: move the line over.
    Adopt { source: Uuid },
}

/// Plan the line-by-line merge of a session cart into a customer cart.
pub(crate) fn plan_merge(
    customer_items: &[CartItem],
    session_items: &[CartItem],
) -> Vec<MergeAction> {
    session_items
        .iter()
        .map(|session_item| {
            match customer_items
                .iter()
                .find(|c| c.product_id == session_item.product_id)
            {
                Some(existing) => MergeAction::Fold {
                    target: existing.id,
                    source: session_item.id,
                    quantity: existing.quantity.saturating_add(session_item.quantity),
                },
                None => MergeAction::Adopt {
                    source: session_item.id,
                },
            }
        })
        .collect()
}

/// Login hook: reconcile the caller's anonymous session cart with the
/// customer's cart. Returns the cart the customer ends up with, if any.
///
/// - no session cart: no-op;
/// - session cart only: re-bind it to the customer;
/// - both: sum overlapping lines, move the rest, delete the session cart.
///
/// Merged quantities are NOT re-checked against inventory here; an
/// oversized line surfaces at checkout. The caller must drop its session
/// cart token afterwards regardless of outcome.
pub async fn merge_on_login(
    db: &PgPool,
    user_id: Uuid,
    session_cart_id: Option<Uuid>,
) -> Result<Option<Cart>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NoCustomer)?;

    let mut tx = db.begin().await?;

    let customer_cart = sqlx::query_as::<_, Cart>(
        "SELECT * FROM carts WHERE customer_id = $1 FOR UPDATE",
    )
    .bind(customer.id)
    .fetch_optional(&mut *tx)
    .await?;

    let session_cart = match session_cart_id {
        Some(cart_id) => {
            sqlx::query_as::<_, Cart>(
                "SELECT * FROM carts WHERE id = $1 AND customer_id IS NULL FOR UPDATE",
            )
            .bind(cart_id)
            .fetch_optional(&mut *tx)
            .await?
        }
        None => None,
    };

    let result = match (customer_cart, session_cart) {
        (None, Some(session)) => {
            let rebound = sqlx::query_as::<_, Cart>(
                "UPDATE carts SET customer_id = $2 WHERE id = $1 RETURNING *",
            )
            .bind(session.id)
            .bind(customer.id)
            .fetch_one(&mut *tx)
            .await?;
            tracing::info!(cart_id = %rebound.id, customer_id = %customer.id, "session cart re-bound at login");
            Some(rebound)
        }
        (Some(target), Some(session)) => {
            let customer_items =
                sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1")
                    .bind(target.id)
                    .fetch_all(&mut *tx)
                    .await?;
            let session_items =
                sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1")
                    .bind(session.id)
                    .fetch_all(&mut *tx)
                    .await?;

            for action in plan_merge(&customer_items, &session_items) {
                match action {
                    MergeAction::Fold {
                        target,
                        source,
                        quantity,
                    } => {
                        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                            .bind(target)
                            .bind(quantity)
                            .execute(&mut *tx)
                            .await?;
                        sqlx::query("DELETE FROM cart_items WHERE id = $1")
                            .bind(source)
                            .execute(&mut *tx)
                            .await?;
                    }
                    MergeAction::Adopt { source } => {
                        sqlx::query("UPDATE cart_items SET cart_id = $2 WHERE id = $1")
                            .bind(source)
                            .bind(target.id)
                            .execute(&mut *tx)
                            .await?;
                    }
                }
            }

            sqlx::query("DELETE FROM carts WHERE id = $1")
                .bind(session.id)
                .execute(&mut *tx)
                .await?;
            tracing::info!(cart_id = %target.id, customer_id = %customer.id, "session cart merged at login");
            Some(target)
        }
        (existing, None) => existing,
    };

    tx.commit().await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(cart_id: Uuid, product_id: Uuid, quantity: i32) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn overlapping_product_folds_with_summed_quantity() {
        let customer_cart = Uuid::new_v4();
        let session_cart = Uuid::new_v4();
        let product_y = Uuid::new_v4();

        let existing = item(customer_cart, product_y, 1);
        let incoming = item(session_cart, product_y, 2);

        let plan = plan_merge(&[existing.clone()], &[incoming.clone()]);
        assert_eq!(
            plan,
            vec![MergeAction::Fold {
                target: existing.id,
                source: incoming.id,
                quantity: 3,
            }]
        );
    }

    #[test]
    fn disjoint_products_are_adopted() {
        let customer_cart = Uuid::new_v4();
        let session_cart = Uuid::new_v4();

        let existing = item(customer_cart, Uuid::new_v4(), 1);
        let incoming = item(session_cart, Uuid::new_v4(), 4);

        let plan = plan_merge(&[existing], &[incoming.clone()]);
        assert_eq!(plan, vec![MergeAction::Adopt { source: incoming.id }]);
    }

    #[test]
    fn empty_session_cart_plans_nothing() {
        let existing = item(Uuid::new_v4(), Uuid::new_v4(), 2);
        assert!(plan_merge(&[existing], &[]).is_empty());
    }

    #[test]
    fn mixed_plan_keeps_session_order() {
        let customer_cart = Uuid::new_v4();
        let session_cart = Uuid::new_v4();
        let shared = Uuid::new_v4();

        let existing = item(customer_cart, shared, 2);
        let overlap = item(session_cart, shared, 3);
        let fresh = item(session_cart, Uuid::new_v4(), 1);

        let plan = plan_merge(&[existing.clone()], &[overlap.clone(), fresh.clone()]);
        assert_eq!(
            plan,
            vec![
                MergeAction::Fold {
                    target: existing.id,
                    source: overlap.id,
                    quantity: 5,
                },
                MergeAction::Adopt { source: fresh.id },
            ]
        );
    }
}
