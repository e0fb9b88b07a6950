//! Cart-session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! record only ever holds the anonymous cart token; it is minted on the
//! first cart write so browsing alone never creates a session row.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "drive_session";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - Storefront configuration (for the `Secure` flag)
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    // The tower_sessions.session table is created by migration
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// The cart token of this session, if one was minted.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store cannot be read.
pub async fn cart_token(session: &Session) -> Result<Option<String>, AppError> {
    session
        .get::<String>(session_keys::CART_TOKEN)
        .await
        .map_err(|e| session_error(&e))
}

/// The cart token of this session, minting and storing one if needed.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store cannot be read or written.
pub async fn ensure_cart_token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = cart_token(session).await? {
        return Ok(token);
    }
    let token = URL_SAFE_NO_PAD.encode(rand::random::<[u8; 24]>());
    session
        .insert(session_keys::CART_TOKEN, &token)
        .await
        .map_err(|e| session_error(&e))?;
    Ok(token)
}
