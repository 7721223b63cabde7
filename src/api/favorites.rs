//! Favorite routes: per-product toggle and the caller's favorites list.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Product;
use crate::store::{catalog, favorites};
use crate::{AppState, Result};

use super::Identity;

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub message: String,
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>> {
    let user_id = identity.require_user()?;
    let product = catalog::get_product(&state.db, product_id).await?;

    let outcome = favorites::toggle(
        &state.db,
        user_id,
        favorites::Favoritable::Product(product_id),
    )
    .await?;

    let title = &product.product.title;
    let message = match outcome {
        favorites::ToggleOutcome::Added => format!("Added '{title}' to favorites."),
        favorites::ToggleOutcome::Removed => format!("Removed '{title}' from favorites."),
    };
    Ok(Json(ToggleResponse { message }))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Product>>> {
    let user_id = identity.require_user()?;
    let products = favorites::favorite_products(&state.db, user_id).await?;
    Ok(Json(products))
}
