//! Cart endpoints against a running storefront.
//!
//! Run with: `cargo test -p drive-integration-tests -- --ignored`

use drive_integration_tests::{browser, create_product, get_json, patch_json, pool, post_json};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_adding_same_product_twice_merges_lines() {
    let pool = pool().await;
    let product = create_product(&pool, 10_000, 50).await;
    let client = browser();

    let (status, _) =
        post_json(&client, "/api/cart", &json!({"productId": product, "quantity": 2})).await;
    assert_eq!(status, 200);
    let (status, cart) =
        post_json(&client, "/api/cart", &json!({"productId": product, "quantity": 3})).await;
    assert_eq!(status, 200);

    let items = cart["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(cart["total_cents"], 50_000);

    // The cart-session cookie carries the cart across requests
    let (_, again) = get_json(&client, "/api/cart").await;
    assert_eq!(again, cart);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_quantity_is_clamped_and_zero_removes() {
    let pool = pool().await;
    let product = create_product(&pool, 100, 500).await;
    let client = browser();

    let (_, cart) =
        post_json(&client, "/api/cart", &json!({"productId": product, "quantity": 250})).await;
    assert_eq!(cart["items"][0]["quantity"], 99);

    let item_id = cart["items"][0]["id"].clone();
    let (status, cart) =
        patch_json(&client, "/api/cart", &json!({"itemId": item_id, "quantity": 0})).await;
    assert_eq!(status, 200);
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["total_cents"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_product_is_not_found() {
    let client = browser();
    let (status, body) =
        post_json(&client, "/api/cart", &json!({"productId": 2_000_000_000})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_browsers_do_not_share_carts() {
    let pool = pool().await;
    let product = create_product(&pool, 100, 10).await;
    let first = browser();
    let second = browser();

    post_json(&first, "/api/cart", &json!({"productId": product})).await;
    let (_, other) = get_json(&second, "/api/cart").await;
    assert_eq!(other["items"], json!([]));
}
