//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store, cart token only)
//! 5. Security headers (CSP, framing, caching)
//! 6. Rate limiting (governor, per route group)
//!
//! The login session is not a tower-sessions record: it is the `auth_token`
//! cookie resolved per request by the extractors in [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AUTH_COOKIE_NAME, OptionalUser, RequireAdmin, RequireUser};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{cart_token, create_session_layer, ensure_cart_token};
