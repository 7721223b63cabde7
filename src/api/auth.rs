//! Hooks the external identity service calls into on account lifecycle
//! events. These are explicit synchronous calls, not subscriptions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Customer;
use crate::store::identity;
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct RegisteredHook {
    pub user_id: Uuid,
    #[serde(default)]
    pub is_staff: bool,
}

/// Post-registration: create a customer profile for non-staff users.
pub async fn registered(
    State(state): State<AppState>,
    Json(hook): Json<RegisteredHook>,
) -> Result<(StatusCode, Json<Option<Customer>>)> {
    let customer = identity::ensure_customer(&state.db, hook.user_id, hook.is_staff).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[derive(Debug, Deserialize)]
pub struct LoggedInHook {
    pub user_id: Uuid,
    pub session_cart_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LoggedInResponse {
    /// The cart the customer owns after reconciliation, if any.
    pub cart_id: Option<Uuid>,
    /// Always true: the session's cart token must not be reused after
    /// login.
    pub clear_session_cart: bool,
}

/// Login: reconcile the session cart with the customer's cart.
pub async fn logged_in(
    State(state): State<AppState>,
    Json(hook): Json<LoggedInHook>,
) -> Result<Json<LoggedInResponse>> {
    let cart = identity::merge_on_login(&state.db, hook.user_id, hook.session_cart_id).await?;
    Ok(Json(LoggedInResponse {
        cart_id: cart.map(|c| c.id),
        clear_session_cart: true,
    }))
}
