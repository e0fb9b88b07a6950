//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `STOREFRONT_STATIC_DIR` - Directory served for non-API paths (default: `public`)
//! - `STOREFRONT_CART_MODE` - `session` (database) or `local` (in-memory), default `session`
//! - `SMTP_HOST` - SMTP relay; without it confirmation emails are only logged
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - SMTP credentials
//! - `EMAIL_FROM` - Sender mailbox (default: `DRIVE Energy <noreply@drive-energy.cz>`)
//! - `INVOICE_SUPPLIER_NAME` - Supplier name printed on invoices
//! - `INVOICE_SUPPLIER_ADDRESS` - Supplier address, `|` separates lines
//! - `INVOICE_SUPPLIER_ID` - Company registration number (IČO)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const DEFAULT_EMAIL_FROM: &str = "DRIVE Energy <noreply@drive-energy.cz>";
const DEFAULT_SUPPLIER_NAME: &str = "DRIVE Energy s.r.o.";
const DEFAULT_SUPPLIER_ADDRESS: &str = "Praha, Česká republika";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which cart store backs `/api/cart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// Carts persisted in Postgres, keyed by the cart-session cookie.
    #[default]
    Session,
    /// Carts kept in process memory only.
    Local,
}

impl FromStr for CartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "local" => Ok(Self::Local),
            other => Err(format!("expected 'session' or 'local', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Static site directory
    pub static_dir: PathBuf,
    /// Cart store selection
    pub cart_mode: CartMode,
    /// Outbound email settings
    pub email: EmailConfig,
    /// Supplier block printed on invoices
    pub invoice: InvoiceSupplier,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Outbound email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender mailbox, e.g. `DRIVE Energy <noreply@drive-energy.cz>`
    pub from: String,
    /// SMTP relay; `None` means deliveries are logged instead of sent
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Supplier details for the invoice header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSupplier {
    pub name: String,
    pub address_lines: Vec<String>,
    pub company_id: Option<String>,
}

impl Default for InvoiceSupplier {
    fn default() -> Self {
        Self {
            name: DEFAULT_SUPPLIER_NAME.to_string(),
            address_lines: vec![DEFAULT_SUPPLIER_ADDRESS.to_string()],
            company_id: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the SMTP password looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_optional_env("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let static_dir = PathBuf::from(get_env_or_default("STOREFRONT_STATIC_DIR", "public"));
        let cart_mode = get_env_or_default("STOREFRONT_CART_MODE", "session")
            .parse::<CartMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_CART_MODE".to_string(), e))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            static_dir,
            cart_mode,
            email: EmailConfig::from_env()?,
            invoice: InvoiceSupplier::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let from = get_env_or_default("EMAIL_FROM", DEFAULT_EMAIL_FROM);
        let smtp = match get_optional_env("SMTP_HOST") {
            Some(host) => {
                let password = get_optional_env("SMTP_PASSWORD")
                    .map(|p| {
                        reject_placeholder(&p, "SMTP_PASSWORD")?;
                        Ok(SecretString::from(p))
                    })
                    .transpose()?;
                Some(SmtpConfig {
                    host,
                    port: parse_env("SMTP_PORT", "587")?,
                    username: get_optional_env("SMTP_USERNAME"),
                    password,
                })
            }
            None => None,
        };
        Ok(Self { from, smtp })
    }
}

impl InvoiceSupplier {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_optional_env("INVOICE_SUPPLIER_NAME").unwrap_or(defaults.name),
            address_lines: get_optional_env("INVOICE_SUPPLIER_ADDRESS").map_or(
                defaults.address_lines,
                |raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect()
                },
            ),
            company_id: get_optional_env("INVOICE_SUPPLIER_ID"),
        }
    }
}

impl SmtpConfig {
    /// Credentials for the transport, if both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = self.username.clone()?;
        let pass = self.password.as_ref()?.expose_secret().to_string();
        Some((user, pass))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Reject values that are obviously copied from an example file.
fn reject_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Local-only configuration for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        static_dir: PathBuf::from("public"),
        cart_mode: CartMode::Session,
        email: EmailConfig {
            from: DEFAULT_EMAIL_FROM.to_string(),
            smtp: None,
        },
        invoice: InvoiceSupplier::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        test_config()
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        let mut config = config();
        assert!(!config.secure_cookies());
        config.base_url = "https://drive-energy.cz".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_cart_mode_parse() {
        assert_eq!("session".parse::<CartMode>().unwrap(), CartMode::Session);
        assert_eq!(" LOCAL ".parse::<CartMode>().unwrap(), CartMode::Local);
        assert!("redis".parse::<CartMode>().is_err());
    }

    #[test]
    fn test_reject_placeholder() {
        assert!(reject_placeholder("changeme123", "SMTP_PASSWORD").is_err());
        assert!(reject_placeholder("your-smtp-password", "SMTP_PASSWORD").is_err());
        assert!(reject_placeholder("q8Zr!d0v2LmK", "SMTP_PASSWORD").is_ok());
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let smtp = SmtpConfig {
            host: "smtp.example.cz".to_string(),
            port: 587,
            username: Some("mailer".to_string()),
            password: Some(SecretString::from("super_secret_smtp_password")),
        };

        let debug_output = format!("{smtp:?}");
        assert!(debug_output.contains("smtp.example.cz"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let mut smtp = SmtpConfig {
            host: "smtp.example.cz".to_string(),
            port: 587,
            username: Some("mailer".to_string()),
            password: None,
        };
        assert!(smtp.credentials().is_none());
        smtp.password = Some(SecretString::from("pw"));
        assert_eq!(
            smtp.credentials(),
            Some(("mailer".to_string(), "pw".to_string()))
        );
    }
}
