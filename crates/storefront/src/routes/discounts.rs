//! Discount code lookup for the checkout form.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::services::discount::DiscountService;
use crate::state::AppState;

/// Body of `POST /api/validate-discount`.
#[derive(Debug, Deserialize)]
pub struct ValidateDiscountRequest {
    pub code: Option<String>,
}

/// Outcome of a lookup. Unknown codes are a normal answer, not an error.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValidateDiscountResponse {
    Valid {
        valid: bool,
        code: String,
        discount_percent: u8,
    },
    Invalid {
        valid: bool,
        error: &'static str,
    },
}

/// Check whether a code is active.
///
/// POST /api/validate-discount
#[instrument(skip_all)]
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ValidateDiscountRequest>,
) -> Result<Json<ValidateDiscountResponse>> {
    let code = req
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Code is required".to_string()))?;

    let response = match DiscountService::new(state.pool()).validate(&code).await? {
        Some(discount) => ValidateDiscountResponse::Valid {
            valid: true,
            code: discount.code().to_string(),
            discount_percent: discount.percent(),
        },
        None => ValidateDiscountResponse::Invalid {
            valid: false,
            error: "Invalid or inactive discount code",
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        let valid = serde_json::to_value(ValidateDiscountResponse::Valid {
            valid: true,
            code: "DRIVE10".to_string(),
            discount_percent: 10,
        })
        .unwrap();
        assert_eq!(
            valid,
            serde_json::json!({"valid": true, "code": "DRIVE10", "discount_percent": 10})
        );

        let invalid = serde_json::to_value(ValidateDiscountResponse::Invalid {
            valid: false,
            error: "Invalid or inactive discount code",
        })
        .unwrap();
        assert_eq!(invalid["valid"], false);
        assert!(invalid.get("code").is_none());
    }
}
