//! Product catalog routes.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{Product, ProductSummary};
use crate::state::AppState;

/// List products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductSummary>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}

/// Product detail by numeric id or slug.
///
/// GET /api/products/{id_or_slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .find(&id_or_slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
