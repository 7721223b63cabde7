//! Product reviews: one per (customer, product), re-submitting updates the
//! existing review in place.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::Review;
use crate::Result;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rate: i16,
    /// Omitted on re-submission keeps the stored description.
    pub description: Option<String>,
}

pub async fn upsert_review(
    db: &PgPool,
    customer_id: Uuid,
    product_id: Uuid,
    input: &ReviewInput,
) -> Result<Review> {
    input.validate()?;
    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, customer_id, product_id, rate, description)
         VALUES ($1, $2, $3, $4, COALESCE($5, ''))
         ON CONFLICT (customer_id, product_id)
         DO UPDATE SET rate = EXCLUDED.rate,
                       description = COALESCE($5, reviews.description),
                       updated_at = NOW()
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(product_id)
    .bind(input.rate)
    .bind(&input.description)
    .fetch_one(db)
    .await?;
    Ok(review)
}

pub async fn product_reviews(db: &PgPool, product_id: Uuid) -> Result<Vec<Review>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(product_id)
    .fetch_all(db)
    .await?;
    Ok(reviews)
}
