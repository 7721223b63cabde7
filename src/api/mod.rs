//! HTTP surface: router wiring and request identity extraction.
//!
//! Authentication itself lives upstream. The gateway forwards the resolved
//! user id in `x-user-id` (plus `x-user-staff` for staff accounts), and the
//! caller's session cart token, if any, in `x-cart-session`. Authorization
//! beyond cart/order ownership scoping is likewise the gateway's job.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{AppState, Result, StoreError};

mod auth;
mod cart;
mod catalog;
mod customers;
mod favorites;
mod orders;
mod reviews;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route("/api/v1/products/bump-prices", post(catalog::bump_prices))
        .route(
            "/api/v1/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/api/v1/products/:id/images",
            get(catalog::list_images).post(catalog::add_image),
        )
        .route(
            "/api/v1/products/:id/images/:image_id",
            delete(catalog::delete_image),
        )
        .route("/api/v1/products/:id/favorite", post(favorites::toggle_favorite))
        .route(
            "/api/v1/products/:id/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/api/v1/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/api/v1/categories/:id", get(catalog::get_category))
        .route("/api/v1/customers", get(customers::list_customers))
        .route(
            "/api/v1/customers/:id",
            get(customers::get_customer).patch(customers::update_customer),
        )
        .route("/api/v1/customers/:id/image", put(customers::upload_image))
        .route("/api/v1/favorites", get(favorites::list_favorites))
        .route("/api/v1/cart", get(cart::get_cart))
        .route("/api/v1/cart-items", post(cart::add_cart_item))
        .route(
            "/api/v1/cart-items/:id",
            patch(cart::update_cart_item).delete(cart::remove_cart_item),
        )
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/create-order", post(orders::create_order))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/auth/registered", post(auth::registered))
        .route("/api/v1/auth/logged-in", post(auth::logged_in))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

/// The identity the gateway resolved for this request.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Option<Uuid>,
    pub staff: bool,
    /// Anonymous cart token from the caller's session.
    pub session_cart: Option<Uuid>,
}

impl Identity {
    pub fn require_user(&self) -> Result<Uuid> {
        self.user_id.ok_or(StoreError::Unauthenticated)
    }
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Option<Uuid>> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(Some)
        .ok_or_else(|| StoreError::Validation(format!("invalid {name} header")))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let staff = parts
            .headers
            .get("x-user-staff")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        Ok(Identity {
            user_id: header_uuid(parts, "x-user-id")?,
            staff,
            session_cart: header_uuid(parts, "x-cart-session")?,
        })
    }
}
