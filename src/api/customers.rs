//! Customer profile routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Customer, CustomerImage, Paginated};
use crate::store::customers::{self, CustomerPatch, CustomerProfile};
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Customer>>> {
    let page = customers::list(
        &state.db,
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(20),
    )
    .await?;
    Ok(Json(page))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerProfile>> {
    let profile = customers::get_profile(&state.db, id).await?;
    Ok(Json(profile))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>> {
    let customer = customers::update(&state.db, id, &patch).await?;
    Ok(Json(customer))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadImageRequest {
    #[validate(length(min = 1))]
    pub url: String,
}

/// The profile image is 1:1; uploading replaces the previous one.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UploadImageRequest>,
) -> Result<Json<CustomerImage>> {
    req.validate()?;
    let image = customers::upsert_image(&state.db, id, &req.url).await?;
    Ok(Json(image))
}
