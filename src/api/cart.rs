//! Cart routes.
//!
//! Mutations resolve the caller's own cart first, so a cart item id from
//! someone else's cart reads as not-found rather than leaking across
//! owners. A newly created anonymous cart announces its token in the
//! `x-cart-session` response header (and body) for the caller to store in
//! its session.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Cart, CartItem, CartLine};
use crate::store::carts::{self, CartIdentity};
use crate::store::customers;
use crate::{AppState, Result, StoreError};

use super::Identity;

pub(super) async fn cart_identity(state: &AppState, identity: &Identity) -> Result<CartIdentity> {
    match identity.user_id {
        Some(user_id) => {
            let customer = customers::by_user(&state.db, user_id)
                .await?
                .ok_or(StoreError::NoCustomer)?;
            Ok(CartIdentity::Customer(customer.id))
        }
        None => Ok(CartIdentity::Anonymous(identity.session_cart)),
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    id: Option<Uuid>,
    items: Vec<CartLine>,
    subtotal: i64,
}

fn subtotal(items: &[CartLine]) -> i64 {
    items
        .iter()
        .map(|line| line.unit_price * i64::from(line.quantity))
        .sum()
}

pub async fn get_cart(State(state): State<AppState>, identity: Identity) -> Result<Json<CartView>> {
    let ident = cart_identity(&state, &identity).await?;
    let Some(cart) = carts::find_cart(&state.db, ident).await? else {
        return Ok(Json(CartView {
            id: None,
            items: vec![],
            subtotal: 0,
        }));
    };
    let items = carts::cart_lines(&state.db, cart.id).await?;
    let subtotal = subtotal(&items);
    Ok(Json(CartView {
        id: Some(cart.id),
        items,
        subtotal,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
struct AddedCartItem {
    cart_id: Uuid,
    item: CartItem,
}

fn with_session_header(mut response: Response, cart: &Cart, created: bool) -> Response {
    if created && cart.customer_id.is_none() {
        if let Ok(value) = HeaderValue::from_str(&cart.id.to_string()) {
            response.headers_mut().insert("x-cart-session", value);
        }
    }
    response
}

pub async fn add_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Response> {
    req.validate()?;
    let ident = cart_identity(&state, &identity).await?;
    let resolved = carts::resolve_cart(&state.db, ident).await?;
    let item = carts::add_item(&state.db, &resolved.cart, req.product_id, req.quantity).await?;

    let body = AddedCartItem {
        cart_id: resolved.cart.id,
        item,
    };
    let response = (StatusCode::CREATED, Json(body)).into_response();
    Ok(with_session_header(response, &resolved.cart, resolved.created))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

async fn own_cart(state: &AppState, identity: &Identity) -> Result<Cart> {
    let ident = cart_identity(state, identity).await?;
    carts::find_cart(&state.db, ident)
        .await?
        .ok_or(StoreError::NotFound("cart"))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItem>> {
    req.validate()?;
    let cart = own_cart(&state, &identity).await?;
    let item = carts::update_quantity(&state.db, &cart, item_id, req.quantity).await?;
    Ok(Json(item))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode> {
    let cart = own_cart(&state, &identity).await?;
    carts::remove_item(&state.db, &cart, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
