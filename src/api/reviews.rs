//! Review routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::models::Review;
use crate::store::reviews::{self, ReviewInput};
use crate::store::{catalog, customers};
use crate::{AppState, Result, StoreError};

use super::Identity;

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    let reviews = reviews::product_reviews(&state.db, product_id).await?;
    Ok(Json(reviews))
}

/// Create the caller's review of this product, or update it in place if one
/// already exists.
pub async fn create_review(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let user_id = identity.require_user()?;
    let customer = customers::by_user(&state.db, user_id)
        .await?
        .ok_or(StoreError::NoCustomer)?;
    // 404 before touching the unique upsert
    catalog::get_product(&state.db, product_id).await?;

    let review = reviews::upsert_review(&state.db, customer.id, product_id, &input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
