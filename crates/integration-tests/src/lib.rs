//! Integration tests for the DRIVE Energy storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and seed a scratch database, then start the server
//! cargo run -p drive-cli -- migrate
//! cargo run -p drive-cli -- seed
//! cargo run -p drive-storefront
//!
//! # Run the ignored end-to-end tests against it
//! cargo test -p drive-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Server under test (default `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Same database the server uses; fixtures are
//!   written directly so tests control price and stock

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL for the storefront API.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client with its own cookie jar, i.e. one browser.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the storefront database for fixtures.
pub async fn pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .expect("STOREFRONT_DATABASE_URL must be set for integration tests");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to storefront database")
}

/// A unique suffix so concurrent runs never collide on slugs or emails.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Insert a product with a known price and stock, returning its id.
pub async fn create_product(pool: &PgPool, price_cents: i64, stock: i32) -> i32 {
    sqlx::query_scalar(
        r"
        INSERT INTO shop.products (slug, name, price_cents, stock)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(unique("it-product"))
    .bind("Integration Test Product")
    .bind(price_cents)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("Failed to insert product fixture")
}

/// Current stock of a product.
pub async fn stock_of(pool: &PgPool, product_id: i32) -> i32 {
    sqlx::query_scalar("SELECT stock FROM shop.products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read stock")
}

/// Insert a discount code, returning the stored (upper-cased) code.
pub async fn create_discount(pool: &PgPool, percent: i32, active: bool) -> String {
    let code = unique("IT").to_uppercase();
    sqlx::query("INSERT INTO shop.discount_codes (code, percent, active) VALUES ($1, $2, $3)")
        .bind(&code)
        .bind(percent)
        .bind(active)
        .execute(pool)
        .await
        .expect("Failed to insert discount fixture");
    code
}

/// Wait until some backend is blocked on a lock held by `holder_pid`.
pub async fn wait_until_blocked_by(pool: &PgPool, holder_pid: i32) {
    for _ in 0..100 {
        let blocked: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM pg_stat_activity WHERE $1 = ANY(pg_blocking_pids(pid))",
        )
        .bind(holder_pid)
        .fetch_one(pool)
        .await
        .expect("Failed to read pg_stat_activity");
        if blocked > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no query blocked on backend {holder_pid} within 5s");
}

/// Valid customer fields for `POST /api/checkout`.
#[must_use]
pub fn customer(email: &str) -> Value {
    serde_json::json!({
        "email": email,
        "firstName": "Jana",
        "lastName": "Nováková",
        "address": "Dlouhá 12",
        "city": "Praha",
        "zipCode": "110 00",
        "paymentMethod": "cash_on_delivery",
    })
}

/// Merge extra fields into a JSON object.
#[must_use]
pub fn with(mut base: Value, extra: &Value) -> Value {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    base
}

/// `POST` JSON and return status plus parsed body.
pub async fn post_json(client: &Client, path: &str, body: &Value) -> (u16, Value) {
    let resp = client
        .post(format!("{}{path}", base_url()))
        .json(body)
        .send()
        .await
        .expect("Request failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// `PATCH` JSON and return status plus parsed body.
pub async fn patch_json(client: &Client, path: &str, body: &Value) -> (u16, Value) {
    let resp = client
        .patch(format!("{}{path}", base_url()))
        .json(body)
        .send()
        .await
        .expect("Request failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

/// `GET` and return status plus parsed body.
pub async fn get_json(client: &Client, path: &str) -> (u16, Value) {
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Request failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}
