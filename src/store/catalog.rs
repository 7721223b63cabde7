//! Product catalog: products, categories, images.
//!
//! Read-mostly CRUD. Listing supports the storefront's filter set: exact
//! category, price bounds, title/description search, ordering by title or
//! price, and page/per-page pagination.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Category, Paginated, Product, ProductImage};
use crate::{Result, StoreError};

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category_id: Option<Uuid>,
    pub price_lt: Option<i64>,
    pub price_gt: Option<i64>,
    pub search: Option<String>,
    /// `title`, `-title`, `price` or `-price`; anything else falls back to
    /// newest-first.
    pub ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: i64,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub inventory: Option<i32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(price_lt) = filter.price_lt {
        qb.push(" AND price < ").push_bind(price_lt);
    }
    if let Some(price_gt) = filter.price_gt {
        qb.push(" AND price > ").push_bind(price_gt);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Whitelisted ORDER BY clause; the ordering value never reaches the SQL
/// text unchecked.
pub(crate) fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("title") => "title ASC",
        Some("-title") => "title DESC",
        Some("price") => "price ASC",
        Some("-price") => "price DESC",
        _ => "created_at DESC",
    }
}

pub async fn list_products(db: &PgPool, filter: &ProductFilter) -> Result<Paginated<ProductView>> {
    let page = filter.page.unwrap_or(1).max(1);
    let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

    let mut qb = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY ")
        .push(order_clause(filter.ordering.as_deref()))
        .push(" LIMIT ")
        .push_bind(i64::from(per_page))
        .push(" OFFSET ")
        .push_bind(i64::from((page - 1) * per_page));
    let products: Vec<Product> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let data = with_images(db, products).await?;
    Ok(Paginated { data, total, page })
}

async fn with_images(db: &PgPool, products: Vec<Product>) -> Result<Vec<ProductView>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = ANY($1) ORDER BY position",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    Ok(products
        .into_iter()
        .map(|product| {
            let urls = images
                .iter()
                .filter(|img| img.product_id == product.id)
                .map(|img| img.url.clone())
                .collect();
            ProductView {
                product,
                images: urls,
            }
        })
        .collect())
}

pub async fn get_product(db: &PgPool, id: Uuid) -> Result<ProductView> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound("product"))?;
    let mut views = with_images(db, vec![product]).await?;
    views.pop().ok_or(StoreError::NotFound("product"))
}

fn check_price_ceiling(price: i64, max_price: i64) -> Result<()> {
    if price > max_price {
        return Err(StoreError::Validation(format!(
            "price exceeds the configured ceiling of {max_price}"
        )));
    }
    Ok(())
}

pub async fn create_product(db: &PgPool, input: &ProductInput, max_price: i64) -> Result<Product> {
    input.validate()?;
    check_price_ceiling(input.price, max_price)?;

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, category_id, title, description, price, inventory)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(input.category_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.inventory.unwrap_or(0))
    .fetch_one(db)
    .await?;
    Ok(product)
}

/// Full replacement of the editable fields, enumerated one by one.
pub async fn update_product(
    db: &PgPool,
    id: Uuid,
    input: &ProductInput,
    max_price: i64,
) -> Result<Product> {
    input.validate()?;
    check_price_ceiling(input.price, max_price)?;

    sqlx::query_as::<_, Product>(
        "UPDATE products
         SET category_id = $2, title = $3, description = $4, price = $5,
             inventory = $6, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(input.category_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.inventory.unwrap_or(0))
    .fetch_optional(db)
    .await?
    .ok_or(StoreError::NotFound("product"))
}

/// Products referenced by order lines are frozen history and refuse
/// deletion.
pub async fn delete_product(db: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await;
    match result {
        Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound("product")),
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(
            StoreError::Validation("product is referenced by existing orders".into()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// The periodic price-increase job: every product's price goes up by
/// `amount` minor units. Returns the number of rows touched.
pub async fn bump_all_prices(db: &PgPool, amount: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE products SET price = price + $1, updated_at = NOW()")
        .bind(amount)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

// Categories

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
}

pub async fn list_categories(db: &PgPool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY title")
        .fetch_all(db)
        .await?;
    Ok(categories)
}

pub async fn get_category(db: &PgPool, id: Uuid) -> Result<Category> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound("category"))
}

pub async fn create_category(db: &PgPool, input: &CategoryInput) -> Result<Category> {
    input.validate()?;
    let category =
        sqlx::query_as::<_, Category>("INSERT INTO categories (id, title) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::now_v7())
            .bind(&input.title)
            .fetch_one(db)
            .await?;
    Ok(category)
}

// Product images

#[derive(Debug, Deserialize, Validate)]
pub struct ProductImageInput {
    #[validate(length(min = 1))]
    pub url: String,
    pub position: Option<i32>,
}

pub async fn list_images(db: &PgPool, product_id: Uuid) -> Result<Vec<ProductImage>> {
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(db)
    .await?;
    Ok(images)
}

pub async fn add_image(
    db: &PgPool,
    product_id: Uuid,
    input: &ProductImageInput,
) -> Result<ProductImage> {
    input.validate()?;
    let result = sqlx::query_as::<_, ProductImage>(
        "INSERT INTO product_images (id, product_id, url, position)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(&input.url)
    .bind(input.position.unwrap_or(0))
    .fetch_one(db)
    .await;
    match result {
        Ok(image) => Ok(image),
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
            Err(StoreError::NotFound("product"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_image(db: &PgPool, product_id: Uuid, image_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM product_images WHERE id = $1 AND product_id = $2")
        .bind(image_id)
        .bind(product_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("product image"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_whitelisted() {
        assert_eq!(order_clause(Some("title")), "title ASC");
        assert_eq!(order_clause(Some("-title")), "title DESC");
        assert_eq!(order_clause(Some("price")), "price ASC");
        assert_eq!(order_clause(Some("-price")), "price DESC");
        assert_eq!(order_clause(Some("id; DROP TABLE products")), "created_at DESC");
        assert_eq!(order_clause(None), "created_at DESC");
    }

    #[test]
    fn price_ceiling_is_enforced() {
        assert!(check_price_ceiling(100, 1000).is_ok());
        assert!(check_price_ceiling(1000, 1000).is_ok());
        assert!(matches!(
            check_price_ceiling(1001, 1000),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn product_input_rejects_nonpositive_price() {
        let input = ProductInput {
            title: "Widget".into(),
            description: None,
            price: 0,
            category_id: None,
            inventory: None,
        };
        assert!(input.validate().is_err());
    }
}
