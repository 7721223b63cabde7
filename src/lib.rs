//! Storefront Backend
//!
//! Self-hosted e-commerce backend behind an authenticating gateway.
//!
//! ## Features
//! - Product catalog with categories, images, filtering and search
//! - Shopping carts for anonymous sessions and customers
//! - Login-time cart merging
//! - Atomic checkout with inventory decrement and price snapshots
//! - Customer profiles, favorites and reviews
//!
//! Authentication and session storage are owned by the caller: requests
//! arrive with a resolved identity (`x-user-id`) and, for anonymous
//! shoppers, the cart token the caller keeps in its session
//! (`x-cart-session`).

use axum::{http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use thiserror::Error;

pub mod api;
pub mod config;
pub mod events;
pub mod maintenance;
pub mod models;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub events: events::EventPublisher,
    pub config: Arc<config::Config>,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthenticated,

    #[error("no customer profile for this user")]
    NoCustomer,

    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient inventory for '{product}'")]
    InsufficientInventory { product: String },

    #[error("invalid quantity")]
    InvalidQuantity,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StoreError::Validation(errors.to_string())
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StoreError::NoCustomer => StatusCode::FORBIDDEN,
            StoreError::EmptyCart
            | StoreError::InvalidQuantity
            | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::InsufficientInventory { .. } => StatusCode::CONFLICT,
            StoreError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = match &self {
            StoreError::Storage(_) => "storage error".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": body }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
