//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Environment variable holding the storefront connection string.
const DATABASE_URL_VAR: &str = "STOREFRONT_DATABASE_URL";

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .map(SecretString::from)
        .map_err(|_| format!("{DATABASE_URL_VAR} not set"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(drive_storefront::db::create_pool(&database_url).await?)
}
