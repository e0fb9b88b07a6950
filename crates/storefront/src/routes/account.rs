//! Account route handlers. These routes require authentication.

use axum::{Json, extract::State};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::state::AppState;

/// The caller's orders with their lines, newest first.
///
/// GET /api/user/orders
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}
