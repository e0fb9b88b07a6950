//! Authentication extractors and the `auth_token` cookie.
//!
//! The cookie holds an opaque session token. Each extractor resolves it
//! against `shop.sessions` on every request, so logging out or letting a
//! session expire takes effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::services::auth::{AuthService, SESSION_TTL_DAYS};
use crate::state::AppState;

/// Login cookie name.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Read the login token from the request's `Cookie` headers.
#[must_use]
pub fn auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == AUTH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying a fresh login token.
#[must_use]
pub fn login_cookie(token: &str, secure: bool) -> Option<HeaderValue> {
    let cookie = Cookie::build((AUTH_COOKIE_NAME, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// `Set-Cookie` value that expires the login cookie.
#[must_use]
pub fn logout_cookie(secure: bool) -> Option<HeaderValue> {
    let cookie = Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(token) = auth_token(&parts.headers) else {
        return Ok(None);
    };
    let user = AuthService::new(state.pool()).current_user(&token).await?;
    Ok(user)
}

/// Extractor that requires a logged-in user.
///
/// Rejects with `401 {"error": "Authentication required"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, absent, unknown and expired tokens yield `None`.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state).await?))
    }
}

/// Extractor that requires a logged-in user with the admin role.
///
/// Rejects anonymous requests with 401 and other roles with 403.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin user denied admin endpoint");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}
