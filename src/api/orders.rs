//! Order routes: listing scoped to the caller, and checkout.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::StoreEvent;
use crate::models::{Order, OrderItem, Paginated};
use crate::store::{checkout, customers};
use crate::{AppState, Result, StoreError};

use super::Identity;

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn attach_items(state: &AppState, orders: Vec<Order>) -> Result<Vec<OrderView>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&state.db)
    .await?;

    Ok(orders
        .into_iter()
        .map(|order| {
            let order_items = items
                .iter()
                .filter(|i| i.order_id == order.id)
                .cloned()
                .collect();
            OrderView {
                order,
                items: order_items,
            }
        })
        .collect())
}

/// Staff see every order; customers see their own.
pub async fn list_orders(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<OrderView>>> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let limit = i64::from(per_page);
    let offset = i64::from((page - 1) * per_page);

    let (orders, total) = if identity.staff {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders ORDER BY placed_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&state.db)
            .await?;
        (orders, total)
    } else {
        let user_id = identity.require_user()?;
        let customer = customers::by_user(&state.db, user_id)
            .await?
            .ok_or(StoreError::NoCustomer)?;
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE customer_id = $1
             ORDER BY placed_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(customer.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer.id)
            .fetch_one(&state.db)
            .await?;
        (orders, total)
    };

    let data = attach_items(&state, orders).await?;
    Ok(Json(Paginated { data, total, page }))
}

pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(StoreError::NotFound("order"))?;

    if !identity.staff {
        let user_id = identity.require_user()?;
        let customer = customers::by_user(&state.db, user_id)
            .await?
            .ok_or(StoreError::NoCustomer)?;
        if order.customer_id != customer.id {
            return Err(StoreError::NotFound("order"));
        }
    }

    let mut views = attach_items(&state, vec![order]).await?;
    views.pop().map(Json).ok_or(StoreError::NotFound("order"))
}

/// Checkout: converts the caller's cart into an order.
pub async fn create_order(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<(StatusCode, Json<checkout::PlacedOrder>)> {
    let user_id = identity.require_user()?;
    let placed = checkout::checkout(&state.db, user_id).await?;

    state
        .events
        .publish(StoreEvent::OrderCreated {
            order_id: placed.order.id,
            customer_id: placed.order.customer_id,
            total: placed.total(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(placed)))
}
