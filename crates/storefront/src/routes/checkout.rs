//! Order placement.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use drive_core::{Cents, OrderId};

use super::ApiJson;
use crate::error::Result;
use crate::middleware::{OptionalUser, cart_token};
use crate::services::checkout::{CheckoutRequest, CheckoutService};
use crate::state::AppState;

/// Body returned for a placed (or replayed) order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub ok: bool,
    pub order_id: OrderId,
    pub total_cents: Cents,
    pub discount_cents: Cents,
}

/// Place an order from the session cart or an explicit item list.
///
/// POST /api/checkout
#[instrument(skip_all)]
pub async fn place_order(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let token = cart_token(&session).await?;
    let receipt = CheckoutService::new(state.pool(), state.carts(), state.notifier())
        .checkout(token.as_deref(), user.as_ref(), req)
        .await?;

    Ok(Json(CheckoutResponse {
        ok: true,
        order_id: receipt.id,
        total_cents: receipt.total_cents,
        discount_cents: receipt.discount_cents,
    }))
}
