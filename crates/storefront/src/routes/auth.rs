//! Authentication route handlers.
//!
//! Password registration and login. A successful login sets the
//! `auth_token` cookie and attributes the browser's cart to the user.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use drive_core::{Email, UserId};

use super::ApiJson;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{auth_token, login_cookie, logout_cookie};
use crate::middleware::{OptionalUser, cart_token};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::services::cart::CartStore;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Credentials for registration and login.
#[derive(Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

impl Credentials {
    /// Both fields, or 400 when either is missing or blank.
    fn require(self) -> Result<(String, SecretString)> {
        match (self.email, self.password) {
            (Some(email), Some(password))
                if !email.trim().is_empty() && !password.expose_secret().is_empty() =>
            {
                Ok((email, password))
            }
            _ => Err(AppError::BadRequest(
                "Email and password required".to_string(),
            )),
        }
    }
}

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: UserId,
    pub email: Email,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<CurrentUser>,
}

fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Result<Response> {
    let cookie =
        cookie.ok_or_else(|| AppError::Internal("failed to build auth cookie".to_string()))?;
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account.
///
/// POST /api/auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse> {
    let (email, password) = credentials.require()?;
    let user = AuthService::new(state.pool())
        .register(&email, password.expose_secret())
        .await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(user))))
}

/// Log in and link the current cart to the account.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Response> {
    let (email, password) = credentials.require()?;
    let login = AuthService::new(state.pool())
        .login(&email, password.expose_secret())
        .await?;

    set_sentry_user(&login.user.id, Some(login.user.email.as_str()));

    if let Some(token) = cart_token(&session).await?
        && let Err(e) = state.carts().link_user(&token, login.user.id).await
    {
        // The login itself succeeded; an unlinked cart is still usable.
        tracing::warn!(error = %e, user_id = %login.user.id, "Failed to link cart to user");
    }

    let cookie = login_cookie(&login.token, state.config().secure_cookies());
    let response = Json(AccountResponse::from(login.user)).into_response();
    with_cookie(response, cookie)
}

/// Log out: drop the server session and expire the cookie.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = auth_token(&headers) {
        AuthService::new(state.pool()).logout(&token).await?;
    }
    clear_sentry_user();

    let cookie = logout_cookie(state.config().secure_cookies());
    with_cookie(Json(json!({ "ok": true })).into_response(), cookie)
}

/// The logged-in user, or `null`.
///
/// GET /api/auth/me
pub async fn me(OptionalUser(user): OptionalUser) -> Json<MeResponse> {
    Json(MeResponse { user })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credentials(email: Option<&str>, password: Option<&str>) -> Credentials {
        Credentials {
            email: email.map(String::from),
            password: password.map(|p| SecretString::from(p.to_string())),
        }
    }

    #[test]
    fn test_credentials_require_both_fields() {
        assert!(credentials(Some("a@b.cz"), Some("password1")).require().is_ok());
        for (email, password) in [
            (None, Some("password1")),
            (Some("a@b.cz"), None),
            (Some("  "), Some("password1")),
            (Some("a@b.cz"), Some("")),
        ] {
            let err = credentials(email, password).require().unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.public_message(), "Email and password required");
        }
    }

    #[test]
    fn test_me_serializes_null_for_guests() {
        let body = serde_json::to_value(MeResponse { user: None }).unwrap();
        assert_eq!(body, json!({ "user": null }));
    }
}
