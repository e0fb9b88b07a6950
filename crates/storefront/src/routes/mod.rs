//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products                 - Product listing
//! GET    /api/products/{id_or_slug}    - Product detail
//!
//! # Cart (cart-session cookie)
//! GET    /api/cart                     - Current cart
//! POST   /api/cart                     - Add item {productId, quantity}
//! PATCH  /api/cart                     - Set quantity {itemId, quantity}
//! DELETE /api/cart/{item_id}           - Remove line
//!
//! # Checkout
//! POST   /api/validate-discount        - Look up a discount code
//! POST   /api/checkout                 - Place an order
//!
//! # Auth (stricter rate limit)
//! POST   /api/auth/register            - Create account
//! POST   /api/auth/login               - Log in, sets auth_token cookie
//! POST   /api/auth/logout              - Log out
//! GET    /api/auth/me                  - Current user or null
//!
//! # Account (requires auth)
//! GET    /api/user/orders              - Order history
//!
//! # Admin (requires admin role)
//! GET    /api/admin/discounts          - List discount codes
//! POST   /api/admin/discounts          - Create discount code
//! PATCH  /api/admin/discounts/{id}     - Toggle discount code
//! ```
//!
//! Everything else falls through to the static site.

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod discounts;
pub mod products;

use axum::{
    Router,
    extract::FromRequest,
    routing::{delete, get, patch, post},
};

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error shape
/// (`400 {"error": "Invalid payload"}`).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the auth routes router (mounted at `/api/auth`).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the cart routes router (mounted at `/api/cart`).
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).patch(cart::update))
        .route("/{item_id}", delete(cart::remove))
}

/// Create the admin routes router (mounted at `/api/admin`).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/discounts",
            get(admin::list_discounts).post(admin::create_discount),
        )
        .route("/discounts/{id}", patch(admin::update_discount))
}

/// Every `/api` route except auth.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{id_or_slug}", get(products::show))
        .nest("/api/cart", cart_routes())
        .route("/api/validate-discount", post(discounts::validate))
        .route("/api/checkout", post(checkout::place_order))
        .route("/api/user/orders", get(account::orders))
        .nest("/api/admin", admin_routes())
}

/// Create all API routes without rate limiting.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .merge(api_routes())
}

/// Create all API routes with per-group rate limits.
///
/// The limiters key on the client IP, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn rate_limited_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes().layer(auth_rate_limiter()))
        .merge(api_routes().layer(api_rate_limiter()))
}
