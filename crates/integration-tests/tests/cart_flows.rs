//! Cart behavior: merge-on-add, stock guardrails, removal, and the
//! cart-to-order handoff.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p pomelo-server)
//! - A bootstrapped admin account (see the crate docs)
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use pomelo_integration_tests::{TestContext, decimal_field};
use serde_json::{Value, json};

async fn add_to_cart(ctx: &TestContext, token: &str, product_id: i64, quantity: i32) -> reqwest::Response {
    ctx.client
        .post(ctx.url("/api/cart"))
        .bearer_auth(token)
        .json(&json!({ "productId": product_id, "quantity": quantity }))
        .send()
        .await
        .expect("cart add failed")
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_add_merges_existing_line() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let product = ctx.create_product(&admin, 10, "4.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    let resp = add_to_cart(&ctx, &customer.token, product_id, 2).await;
    assert_eq!(resp.status(), 200);

    let resp = add_to_cart(&ctx, &customer.token, product_id, 3).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("cart response not JSON");

    let items = body["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 1, "same product merges into one line");
    assert_eq!(items[0]["quantity"], 5);
    assert!((decimal_field(&body["total"]) - 20.0).abs() < f64::EPSILON);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_update_beyond_stock_leaves_cart_unchanged() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let product = ctx.create_product(&admin, 5, "4.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    let resp = add_to_cart(&ctx, &customer.token, product_id, 2).await;
    assert_eq!(resp.status(), 200);

    let resp = ctx
        .client
        .put(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .json(&json!({ "productId": product_id, "quantity": 6 }))
        .send()
        .await
        .expect("cart update failed");
    assert_eq!(resp.status(), 400);

    let resp = ctx
        .client
        .get(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart fetch failed");
    let body: Value = resp.json().await.expect("cart response not JSON");
    assert_eq!(body["items"][0]["quantity"], 2, "failed update must not stick");
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_remove_and_clear() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let first = ctx.create_product(&admin, 10, "1.00").await;
    let second = ctx.create_product(&admin, 10, "2.00").await;
    let first_id = first["id"].as_i64().expect("product id missing");
    let second_id = second["id"].as_i64().expect("product id missing");

    add_to_cart(&ctx, &customer.token, first_id, 1).await;
    add_to_cart(&ctx, &customer.token, second_id, 1).await;

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/api/cart/{first_id}")))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart remove failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("cart response not JSON");
    assert_eq!(body["items"].as_array().expect("items missing").len(), 1);

    // Removing an absent product is a no-op, not an error
    let resp = ctx
        .client
        .delete(ctx.url(&format!("/api/cart/{first_id}")))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart remove failed");
    assert_eq!(resp.status(), 200);

    let resp = ctx
        .client
        .delete(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart clear failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("cart response not JSON");
    assert!(body["items"].as_array().expect("items missing").is_empty());
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_direct_order_clears_cart_lines() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let product = ctx.create_product(&admin, 10, "3.50").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    add_to_cart(&ctx, &customer.token, product_id, 2).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .bearer_auth(&customer.token)
        .json(&json!({
            "items": [{ "productId": product_id, "quantity": 2 }],
            "shippingAddress": pomelo_integration_tests::shipping_address(),
        }))
        .send()
        .await
        .expect("order request failed");
    assert_eq!(resp.status(), 201);

    let resp = ctx
        .client
        .get(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart fetch failed");
    let body: Value = resp.json().await.expect("cart response not JSON");
    assert!(
        body["items"].as_array().expect("items missing").is_empty(),
        "placing an order empties the cart"
    );
}
