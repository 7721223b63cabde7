//! Catalog routes: products, categories, product images, price bump.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Paginated, Product, ProductImage};
use crate::store::catalog::{
    self, CategoryInput, ProductFilter, ProductImageInput, ProductInput, ProductView,
};
use crate::{AppState, Result};

pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Paginated<ProductView>>> {
    let page = catalog::list_products(&state.db, &filter).await?;
    Ok(Json(page))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductView>> {
    let product = catalog::get_product(&state.db, id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = catalog::create_product(&state.db, &input, state.config.max_price).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = catalog::update_product(&state.db, id, &input, state.config.max_price).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    catalog::delete_product(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BumpPricesRequest {
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BumpPricesResponse {
    pub updated: u64,
}

/// Operator entry point for the periodic price-increase job.
pub async fn bump_prices(
    State(state): State<AppState>,
    Json(req): Json<BumpPricesRequest>,
) -> Result<Json<BumpPricesResponse>> {
    let updated = catalog::bump_all_prices(&state.db, req.amount.unwrap_or(1)).await?;
    tracing::info!(updated, "bumped all product prices");
    Ok(Json(BumpPricesResponse { updated }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = catalog::list_categories(&state.db).await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>> {
    let category = catalog::get_category(&state.db, id).await?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = catalog::create_category(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_images(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<ProductImage>>> {
    let images = catalog::list_images(&state.db, product_id).await?;
    Ok(Json(images))
}

pub async fn add_image(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductImageInput>,
) -> Result<(StatusCode, Json<ProductImage>)> {
    let image = catalog::add_image(&state.db, product_id, &input).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path((product_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    catalog::delete_image(&state.db, product_id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
