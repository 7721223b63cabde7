//! Favorites: a tagged `(kind, id)` relation instead of an open-ended
//! dynamic one. Adding a favoritable kind means adding a variant here; the
//! compiler finds every place that must handle it.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Product;
use crate::Result;

/// Everything a user can favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Favoritable {
    Product(Uuid),
}

impl Favoritable {
    /// Stable tag stored in the `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Favoritable::Product(_) => "product",
        }
    }

    pub fn object_id(&self) -> Uuid {
        match self {
            Favoritable::Product(id) => *id,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Flip the favorite state of `favoritable` for this user.
pub async fn toggle(db: &PgPool, user_id: Uuid, favoritable: Favoritable) -> Result<ToggleOutcome> {
    let removed = sqlx::query(
        "DELETE FROM favorites WHERE user_id = $1 AND kind = $2 AND object_id = $3",
    )
    .bind(user_id)
    .bind(favoritable.kind())
    .bind(favoritable.object_id())
    .execute(db)
    .await?;

    if removed.rows_affected() > 0 {
        return Ok(ToggleOutcome::Removed);
    }

    sqlx::query("INSERT INTO favorites (id, user_id, kind, object_id) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(favoritable.kind())
        .bind(favoritable.object_id())
        .execute(db)
        .await?;
    Ok(ToggleOutcome::Added)
}

/// Products this user has favorited, most recent first.
pub async fn favorite_products(db: &PgPool, user_id: Uuid) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.* FROM products p
         JOIN favorites f ON f.object_id = p.id AND f.kind = 'product'
         WHERE f.user_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_favoritable_tags_as_product() {
        let id = Uuid::new_v4();
        let favoritable = Favoritable::Product(id);
        assert_eq!(favoritable.kind(), "product");
        assert_eq!(favoritable.object_id(), id);
    }
}
