//! Discount code administration. Admin role required.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use drive_core::DiscountId;

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::DiscountCode;
use crate::services::discount::DiscountService;
use crate::state::AppState;

/// Body of `POST /api/admin/discounts`.
#[derive(Debug, Deserialize)]
pub struct CreateDiscountRequest {
    pub code: String,
    pub percent: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Body of `PATCH /api/admin/discounts/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateDiscountRequest {
    pub active: bool,
}

/// GET /api/admin/discounts
pub async fn list_discounts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<DiscountCode>>> {
    Ok(Json(DiscountService::new(state.pool()).list().await?))
}

/// POST /api/admin/discounts
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_discount(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(req): ApiJson<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<DiscountCode>)> {
    let created = DiscountService::new(state.pool())
        .create(&req.code, req.percent, req.active)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/admin/discounts/{id}
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn update_discount(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateDiscountRequest>,
) -> Result<Json<DiscountCode>> {
    let id = id
        .parse::<DiscountId>()
        .map_err(|_| AppError::NotFound("Discount code not found".to_string()))?;
    let updated = DiscountService::new(state.pool())
        .set_active(id, req.active)
        .await?;
    Ok(Json(updated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_codes_default_to_active() {
        let req: CreateDiscountRequest =
            serde_json::from_str(r#"{"code": "summer", "percent": 15}"#).unwrap();
        assert!(req.active);
        assert_eq!(req.percent, 15);
    }
}
