//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. Every error body is `{"error": "..."}`.
//! All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::discount::DiscountServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart store operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Discount administration failed.
    #[error("Discount error: {0}")]
    Discount(#[from] DiscountServiceError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Cart(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_)
                | CheckoutError::Plan(_)
                | CheckoutError::IdempotencyKey => StatusCode::BAD_REQUEST,
                CheckoutError::Cart(_) | CheckoutError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Discount(err) => match err {
                DiscountServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
                DiscountServiceError::Duplicate => StatusCode::CONFLICT,
                DiscountServiceError::NotFound => StatusCode::NOT_FOUND,
                DiscountServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show the client.
    ///
    /// Internal error details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Cart(_) | Self::Internal(_) => INTERNAL.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => "Email already registered".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => INTERNAL.to_string(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_)
                | CheckoutError::Plan(_)
                | CheckoutError::IdempotencyKey => err.to_string(),
                CheckoutError::Cart(_) | CheckoutError::Repository(_) => {
                    "Failed to process order".to_string()
                }
            },
            Self::Discount(err) => match err {
                DiscountServiceError::Repository(_) => INTERNAL.to_string(),
                other => capitalize(&other.to_string()),
            },
            _ => self.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::BadRequest("Invalid payload".to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drive_core::checkout::{PlanError, ValidationError};
    use drive_core::discount::DiscountError;

    async fn body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Product not found");

        let err = AppError::BadRequest("Invalid payload".to_string());
        assert_eq!(err.to_string(), "Invalid payload");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized("test".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("test".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BadRequest("test".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(DiscountServiceError::Duplicate).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_insufficient_stock_body() {
        let err = AppError::from(CheckoutError::Plan(PlanError::InsufficientStock {
            product: "DRIVE Mango".to_string(),
            available: 3,
        }));
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Not enough stock for DRIVE Mango. Available: 3");
    }

    #[tokio::test]
    async fn test_validation_body_names_fields() {
        let err = AppError::from(CheckoutError::Validation(ValidationError::MissingFields(
            vec!["email", "city"],
        )));
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing required fields: email, city");
    }

    #[tokio::test]
    async fn test_invalid_credentials_body_is_uniform() {
        let (status, json) = body(AppError::from(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, serde_json::json!({"error": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::from(CheckoutError::Repository(RepositoryError::DataCorruption(
            "secret detail".to_string(),
        )));
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to process order");

        let (_, json) = body(AppError::Database(RepositoryError::NotFound)).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_discount_errors() {
        let (status, json) = body(AppError::from(DiscountServiceError::Invalid(
            DiscountError::PercentOutOfRange,
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Discount percent must be between 1 and 100");

        let (status, json) = body(AppError::from(DiscountServiceError::NotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Discount code not found");
    }
}
