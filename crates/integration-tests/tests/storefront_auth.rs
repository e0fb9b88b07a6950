//! Accounts, login sessions and order history against a running storefront.
//!
//! Run with: `cargo test -p drive-integration-tests -- --ignored`

use drive_integration_tests::{
    browser, create_product, customer, get_json, pool, post_json, unique, with,
};
use serde_json::json;

fn credentials(email: &str) -> serde_json::Value {
    json!({"email": email, "password": "energie-2026"})
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_then_duplicate() {
    let client = browser();
    let email = format!("{}@example.cz", unique("reg"));

    let (status, body) = post_json(&client, "/api/auth/register", &credentials(&email)).await;
    assert_eq!(status, 201);
    assert_eq!(body["email"], email);
    assert!(body["id"].is_i64());

    let (status, body) = post_json(&client, "/api/auth/register", &credentials(&email)).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_login_me_logout() {
    let client = browser();
    let email = format!("{}@example.cz", unique("login"));
    post_json(&client, "/api/auth/register", &credentials(&email)).await;

    let (status, body) = post_json(
        &client,
        "/api/auth/login",
        &json!({"email": email, "password": "wrong-password"}),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = post_json(&client, "/api/auth/login", &credentials(&email)).await;
    assert_eq!(status, 200);
    assert_eq!(body["email"], email);

    let (_, me) = get_json(&client, "/api/auth/me").await;
    assert_eq!(me["user"]["email"], email);
    assert_eq!(me["user"]["role"], "customer");

    let (status, body) = post_json(&client, "/api/auth/logout", &json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"ok": true}));

    let (_, me) = get_json(&client, "/api/auth/me").await;
    assert_eq!(me, json!({"user": null}));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_orders_are_attributed_to_logged_in_user() {
    let pool = pool().await;
    let product = create_product(&pool, 1_990, 10).await;
    let client = browser();
    let email = format!("{}@example.cz", unique("history"));
    post_json(&client, "/api/auth/register", &credentials(&email)).await;
    post_json(&client, "/api/auth/login", &credentials(&email)).await;

    post_json(&client, "/api/cart", &json!({"productId": product, "quantity": 3})).await;
    let (status, order) = post_json(&client, "/api/checkout", &customer(&email)).await;
    assert_eq!(status, 200, "{order}");

    let (status, orders) = get_json(&client, "/api/user/orders").await;
    assert_eq!(status, 200);
    let orders = orders.as_array().expect("orders array");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order["orderId"]);
    assert_eq!(orders[0]["total_cents"], 5_970);
    assert_eq!(orders[0]["items"][0]["quantity"], 3);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_customers_cannot_manage_discounts() {
    let client = browser();
    let email = format!("{}@example.cz", unique("nonadmin"));
    post_json(&client, "/api/auth/register", &credentials(&email)).await;
    post_json(&client, "/api/auth/login", &credentials(&email)).await;

    let (status, body) = post_json(
        &client,
        "/api/admin/discounts",
        &with(json!({"code": unique("x")}), &json!({"percent": 5})),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_email_and_wrong_password_look_the_same() {
    let client = browser();
    let email = format!("{}@example.cz", unique("enum"));
    post_json(&client, "/api/auth/register", &credentials(&email)).await;

    let wrong_password = post_json(
        &client,
        "/api/auth/login",
        &json!({"email": email, "password": "not-the-password"}),
    )
    .await;
    let unknown_email = post_json(
        &client,
        "/api/auth/login",
        &credentials(&format!("{}@example.cz", unique("nobody"))),
    )
    .await;

    assert_eq!(wrong_password.0, 401);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_rejects_email_in_other_case() {
    let pool = pool().await;
    let client = browser();
    let email = format!("{}@example.cz", unique("case"));

    let (status, _) = post_json(&client, "/api/auth/register", &credentials(&email)).await;
    assert_eq!(status, 201);

    let shouted = email.to_uppercase();
    let (status, body) = post_json(&client, "/api/auth/register", &credentials(&shouted)).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "Email already registered");

    let rows: i64 = sqlx::query_scalar("SELECT count(*) FROM shop.users WHERE lower(email) = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .expect("count users");
    assert_eq!(rows, 1);
}
