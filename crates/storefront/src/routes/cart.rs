//! Cart API handlers.
//!
//! Every handler answers with the authoritative cart view. The cart token is
//! kept in the cart-session cookie and only minted when a line is added.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use drive_core::cart::clamp_quantity;
use drive_core::{CartItemId, ProductId};

use super::ApiJson;
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{cart_token, ensure_cart_token};
use crate::services::cart::{CartStore, CartView};
use crate::state::AppState;

fn invalid_payload() -> AppError {
    AppError::BadRequest("Invalid payload".to_string())
}

/// Body of `POST /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

/// Body of `PATCH /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub item_id: Option<CartItemId>,
    pub quantity: Option<i64>,
}

/// Current cart.
///
/// GET /api/cart
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let view = match cart_token(&session).await? {
        Some(token) => state.carts().get(&token).await?,
        None => CartView::default(),
    };
    Ok(Json(view))
}

/// Add a product, merging with an existing line.
///
/// POST /api/cart
#[instrument(skip_all, fields(product_id = ?req.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>> {
    let product_id = req.product_id.ok_or_else(invalid_payload)?;
    let quantity = req
        .quantity
        .and_then(clamp_quantity)
        .ok_or_else(invalid_payload)?;

    let product = ProductRepository::new(state.pool())
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let token = ensure_cart_token(&session).await?;
    let view = state
        .carts()
        .add_item(&token, product.snapshot(), quantity)
        .await?;
    Ok(Json(view))
}

/// Set a line's quantity; zero removes it.
///
/// PATCH /api/cart
#[instrument(skip_all, fields(item_id = ?req.item_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let item_id = req.item_id.ok_or_else(invalid_payload)?;
    let quantity = req.quantity.filter(|q| *q >= 0).ok_or_else(invalid_payload)?;

    let Some(token) = cart_token(&session).await? else {
        return Ok(Json(CartView::default()));
    };
    let view = state
        .carts()
        .set_quantity(&token, item_id, quantity)
        .await?;
    Ok(Json(view))
}

/// Remove a line. Unknown ids are ignored.
///
/// DELETE /api/cart/{item_id}
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<String>,
) -> Result<Json<CartView>> {
    let item_id = item_id
        .parse::<CartItemId>()
        .map_err(|_| invalid_payload())?;

    let Some(token) = cart_token(&session).await? else {
        return Ok(Json(CartView::default()));
    };
    let view = state.carts().remove_item(&token, item_id).await?;
    Ok(Json(view))
}
