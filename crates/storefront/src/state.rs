//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::cart::CartBackend;
use crate::services::notification::{EmailError, Notifier};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    carts: CartBackend,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The cart store is chosen here, once, from `config.cart_mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the email configuration is invalid.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, EmailError> {
        let carts = CartBackend::for_mode(config.cart_mode, &pool);
        let notifier = Notifier::new(&config.email, config.invoice.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts,
                notifier,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the active cart store.
    #[must_use]
    pub fn carts(&self) -> &CartBackend {
        &self.inner.carts
    }

    /// Get a reference to the order notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
