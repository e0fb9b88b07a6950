//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `products` - Catalog rows, the only holder of live price and stock
//! - `discount_codes` - Percent codes, stored upper-cased
//! - `users` - Accounts with argon2 password hashes and a role
//! - `sessions` - Bearer tokens behind the `auth_token` cookie
//! - `carts` / `cart_items` - Server-side carts keyed by cart-session token
//! - `orders` / `order_items` - Order snapshots written by checkout
//!
//! The `tower_sessions.session` table backs the cart-session cookie.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p drive-cli -- migrate
//! ```

pub mod carts;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod sessions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use discounts::DiscountRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use sessions::SessionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
