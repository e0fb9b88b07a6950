//! Checkout against a running storefront.
//!
//! Run with: `cargo test -p drive-integration-tests -- --ignored`

use std::time::Duration;

use drive_integration_tests::{
    browser, create_discount, create_product, customer, get_json, pool, post_json, stock_of,
    unique, wait_until_blocked_by, with,
};
use serde_json::{Value, json};

fn order_id(order: &Value) -> i32 {
    i32::try_from(order["orderId"].as_i64().expect("order id")).expect("i32 id")
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_discounted_checkout_persists_order_and_empties_cart() {
    let pool = pool().await;
    let a = create_product(&pool, 100, 10).await;
    let b = create_product(&pool, 250, 10).await;
    let code = create_discount(&pool, 10, true).await;
    let client = browser();

    post_json(&client, "/api/cart", &json!({"productId": a, "quantity": 2})).await;
    post_json(&client, "/api/cart", &json!({"productId": b, "quantity": 1})).await;

    let email = format!("{}@example.cz", unique("buyer"));
    let body = with(customer(&email), &json!({"discountCode": code.to_lowercase()}));
    let (status, order) = post_json(&client, "/api/checkout", &body).await;

    assert_eq!(status, 200, "{order}");
    assert_eq!(order["ok"], true);
    assert_eq!(order["totalCents"], 405);
    assert_eq!(order["discountCents"], 45);

    let items: i64 = sqlx::query_scalar("SELECT count(*) FROM shop.order_items WHERE order_id = $1")
        .bind(order_id(&order))
        .fetch_one(&pool)
        .await
        .expect("count order items");
    assert_eq!(items, 2);

    assert_eq!(stock_of(&pool, a).await, 8);
    assert_eq!(stock_of(&pool, b).await, 9);

    let (_, cart) = get_json(&client, "/api/cart").await;
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_last_unit_sells_once() {
    let pool = pool().await;
    let product = create_product(&pool, 500, 1).await;

    let order = |n: usize| {
        let body = with(
            customer(&format!("{}@example.cz", unique(&format!("race{n}")))),
            &json!({"items": [{"productId": product, "quantity": 1}]}),
        );
        async move { post_json(&browser(), "/api/checkout", &body).await }
    };

    let ((s1, b1), (s2, b2)) = tokio::join!(order(1), order(2));
    let mut statuses = [s1, s2];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 400], "{b1} / {b2}");

    let failure = if s1 == 400 { b1 } else { b2 };
    assert!(
        failure["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Not enough stock")),
        "{failure}"
    );
    assert_eq!(stock_of(&pool, product).await, 0);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_idempotency_key_replays_order() {
    let pool = pool().await;
    let product = create_product(&pool, 1_000, 10).await;
    let client = browser();

    let body = with(
        customer(&format!("{}@example.cz", unique("retry"))),
        &json!({
            "items": [{"productId": product, "quantity": 2}],
            "idempotencyKey": unique("key"),
        }),
    );

    let (status, first) = post_json(&client, "/api/checkout", &body).await;
    assert_eq!(status, 200, "{first}");
    let (status, second) = post_json(&client, "/api/checkout", &body).await;
    assert_eq!(status, 200, "{second}");

    assert_eq!(first["orderId"], second["orderId"]);
    assert_eq!(stock_of(&pool, product).await, 8);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_empty_cart_is_rejected() {
    let client = browser();
    let body = customer(&format!("{}@example.cz", unique("empty")));
    let (status, body) = post_json(&client, "/api/checkout", &body).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_inactive_discount_does_not_validate() {
    let pool = pool().await;
    let active = create_discount(&pool, 15, true).await;
    let inactive = create_discount(&pool, 15, false).await;
    let client = browser();

    let (status, body) =
        post_json(&client, "/api/validate-discount", &json!({"code": active})).await;
    assert_eq!(status, 200);
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount_percent"], 15);

    let (status, body) =
        post_json(&client, "/api/validate-discount", &json!({"code": inactive})).await;
    assert_eq!(status, 200);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_item_added_during_checkout_stays_in_cart() {
    let pool = pool().await;
    let a = create_product(&pool, 100, 10).await;
    let b = create_product(&pool, 250, 10).await;
    let client = browser();
    post_json(&client, "/api/cart", &json!({"productId": a, "quantity": 2})).await;

    // Hold product A so checkout stalls after it has read the cart.
    let mut holder = pool.begin().await.expect("begin");
    let holder_pid: i32 = sqlx::query_scalar("SELECT pg_backend_pid()")
        .fetch_one(&mut *holder)
        .await
        .expect("backend pid");
    sqlx::query("SELECT id FROM shop.products WHERE id = $1 FOR UPDATE")
        .bind(a)
        .execute(&mut *holder)
        .await
        .expect("lock product");

    let checkout = tokio::spawn({
        let client = client.clone();
        let body = customer(&format!("{}@example.cz", unique("tabs")));
        async move { post_json(&client, "/api/checkout", &body).await }
    });
    wait_until_blocked_by(&pool, holder_pid).await;

    // Second tab adds another product while the order is being placed.
    let add = tokio::spawn({
        let client = client.clone();
        async move { post_json(&client, "/api/cart", &json!({"productId": b, "quantity": 1})).await }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    holder.commit().await.expect("release product");

    let (status, order) = checkout.await.expect("checkout task");
    assert_eq!(status, 200, "{order}");
    let (status, _) = add.await.expect("add task");
    assert_eq!(status, 200);

    let ordered: Vec<Option<i32>> =
        sqlx::query_scalar("SELECT product_id FROM shop.order_items WHERE order_id = $1")
            .bind(order_id(&order))
            .fetch_all(&pool)
            .await
            .expect("order items");
    assert_eq!(ordered, vec![Some(a)]);
    assert_eq!(stock_of(&pool, a).await, 8);
    assert_eq!(stock_of(&pool, b).await, 10);

    let (_, cart) = get_json(&client, "/api/cart").await;
    let items = cart["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1, "{cart}");
    assert_eq!(items[0]["product_id"], b);
    assert_eq!(items[0]["quantity"], 1);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_order_items_keep_price_and_name_at_commit() {
    let pool = pool().await;
    let product = create_product(&pool, 300, 10).await;
    let client = browser();

    let body = with(
        customer(&format!("{}@example.cz", unique("snapshot"))),
        &json!({"items": [{"productId": product, "quantity": 2}]}),
    );
    let (status, order) = post_json(&client, "/api/checkout", &body).await;
    assert_eq!(status, 200, "{order}");

    sqlx::query("UPDATE shop.products SET price_cents = 999, name = 'Renamed' WHERE id = $1")
        .bind(product)
        .execute(&pool)
        .await
        .expect("reprice product");

    let (name, unit_price): (String, i64) = sqlx::query_as(
        "SELECT product_name, unit_price_cents FROM shop.order_items WHERE order_id = $1",
    )
    .bind(order_id(&order))
    .fetch_one(&pool)
    .await
    .expect("order item");
    assert_eq!(name, "Integration Test Product");
    assert_eq!(unit_price, 300);

    let total: i64 = sqlx::query_scalar("SELECT total_cents FROM shop.orders WHERE id = $1")
        .bind(order_id(&order))
        .fetch_one(&pool)
        .await
        .expect("order total");
    assert_eq!(total, 600);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_discount_code_checks_out_undiscounted() {
    let pool = pool().await;
    let product = create_product(&pool, 300, 10).await;
    let inactive = create_discount(&pool, 50, false).await;

    for code in [unique("NOPE"), inactive] {
        let body = with(
            customer(&format!("{}@example.cz", unique("nocode"))),
            &json!({
                "items": [{"productId": product, "quantity": 2}],
                "discountCode": code,
            }),
        );
        let (status, order) = post_json(&browser(), "/api/checkout", &body).await;
        assert_eq!(status, 200, "{order}");
        assert_eq!(order["totalCents"], 600);
        assert_eq!(order["discountCents"], 0);
    }
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_quantity_over_stock_is_rejected_without_side_effects() {
    let pool = pool().await;
    let product = create_product(&pool, 300, 2).await;
    let client = browser();
    post_json(&client, "/api/cart", &json!({"productId": product, "quantity": 3})).await;

    let body = customer(&format!("{}@example.cz", unique("greedy")));
    let (status, body) = post_json(&client, "/api/checkout", &body).await;
    assert_eq!(status, 400);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Not enough stock")),
        "{body}"
    );

    assert_eq!(stock_of(&pool, product).await, 2);
    let (_, cart) = get_json(&client, "/api/cart").await;
    assert_eq!(cart["items"][0]["quantity"], 3);
}
