//! Customer profiles and their 1:1 profile image.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Customer, CustomerImage, Paginated};
use crate::{Result, StoreError};

#[derive(Debug, Serialize)]
pub struct CustomerProfile {
    #[serde(flatten)]
    pub customer: Customer,
    pub image: Option<String>,
}

/// Enumerated patch for the editable profile fields. Fields left out of the
/// request keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct CustomerPatch {
    pub birth_date: Option<chrono::NaiveDate>,
    pub location: Option<String>,
    #[validate(length(min = 5, max = 15))]
    pub second_phone_number: Option<String>,
}

pub async fn by_user(db: &PgPool, user_id: Uuid) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(customer)
}

pub async fn get_profile(db: &PgPool, id: Uuid) -> Result<CustomerProfile> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound("customer"))?;
    let image =
        sqlx::query_scalar::<_, String>("SELECT url FROM customer_images WHERE customer_id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(CustomerProfile { customer, image })
}

pub async fn list(db: &PgPool, page: u32, per_page: u32) -> Result<Paginated<Customer>> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    let customers = sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(i64::from(per_page))
    .bind(i64::from((page - 1) * per_page))
    .fetch_all(db)
    .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(db)
        .await?;
    Ok(Paginated {
        data: customers,
        total,
        page,
    })
}

pub async fn update(db: &PgPool, id: Uuid, patch: &CustomerPatch) -> Result<Customer> {
    patch.validate()?;
    sqlx::query_as::<_, Customer>(
        "UPDATE customers
         SET birth_date = COALESCE($2, birth_date),
             location = COALESCE($3, location),
             second_phone_number = COALESCE($4, second_phone_number)
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(patch.birth_date)
    .bind(&patch.location)
    .bind(&patch.second_phone_number)
    .fetch_optional(db)
    .await?
    .ok_or(StoreError::NotFound("customer"))
}

/// The profile image is 1:1 with the customer, so an upload replaces any
/// previous one.
pub async fn upsert_image(db: &PgPool, customer_id: Uuid, url: &str) -> Result<CustomerImage> {
    let result = sqlx::query_as::<_, CustomerImage>(
        "INSERT INTO customer_images (id, customer_id, url) VALUES ($1, $2, $3)
         ON CONFLICT (customer_id)
         DO UPDATE SET url = EXCLUDED.url, uploaded_at = NOW()
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(url)
    .fetch_one(db)
    .await;
    match result {
        Ok(image) => Ok(image),
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
            Err(StoreError::NotFound("customer"))
        }
        Err(e) => Err(e.into()),
    }
}
