//! Admin API coverage: authorization boundary, catalog management, stock
//! adjustment, and stats.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p pomelo-server)
//! - A bootstrapped admin account (see the crate docs)
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use pomelo_integration_tests::TestContext;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_admin_routes_forbidden_for_customers() {
    let ctx = TestContext::new();
    let customer = ctx.signup_customer().await;

    for path in [
        "/api/admin/products",
        "/api/admin/orders",
        "/api/admin/customers",
        "/api/admin/dashboard/stats",
    ] {
        let resp = ctx
            .client
            .get(ctx.url(path))
            .bearer_auth(&customer.token)
            .send()
            .await
            .expect("request failed");
        assert_eq!(resp.status(), 403, "{path} must be admin-only");
    }

    // No token at all is a 401, not a 403
    let resp = ctx
        .client
        .get(ctx.url("/api/admin/products"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_product_update_and_inactive_hiding() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;

    let product = ctx.create_product(&admin, 5, "10.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    let resp = ctx
        .client
        .put(ctx.url(&format!("/api/admin/products/{product_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "price": "12.50", "status": "inactive" }))
        .send()
        .await
        .expect("update request failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("update response not JSON");
    assert_eq!(body["product"]["status"], "inactive");
    assert_eq!(body["product"]["price"], "12.50");

    // Inactive products disappear from the public catalog
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{product_id}")))
        .send()
        .await
        .expect("public fetch failed");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_duplicate_sku_conflicts() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;

    let product = ctx.create_product(&admin, 5, "10.00").await;
    let sku = product["sku"].as_str().expect("sku missing");

    let resp = ctx
        .client
        .post(ctx.url("/api/admin/products"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Copycat",
            "description": "Same SKU",
            "price": "5.00",
            "category": "Other",
            "stock": 1,
            "sku": sku,
        }))
        .send()
        .await
        .expect("create request failed");
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_stock_adjustment() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;

    let product = ctx.create_product(&admin, 5, "10.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    let resp = ctx
        .client
        .patch(ctx.url("/api/admin/products/stock"))
        .bearer_auth(&admin)
        .json(&json!({ "productId": product_id, "quantity": 3, "operation": "add" }))
        .send()
        .await
        .expect("stock add failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("stock response not JSON");
    assert_eq!(body["product"]["stock"], 8);

    // Overdraw is refused and leaves stock alone
    let resp = ctx
        .client
        .patch(ctx.url("/api/admin/products/stock"))
        .bearer_auth(&admin)
        .json(&json!({ "productId": product_id, "quantity": 9, "operation": "subtract" }))
        .send()
        .await
        .expect("stock subtract failed");
    assert_eq!(resp.status(), 400);

    let resp = ctx
        .client
        .patch(ctx.url("/api/admin/products/stock"))
        .bearer_auth(&admin)
        .json(&json!({ "productId": product_id, "quantity": 8, "operation": "subtract" }))
        .send()
        .await
        .expect("stock subtract failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("stock response not JSON");
    assert_eq!(body["product"]["stock"], 0);
    assert_eq!(body["product"]["status"], "out_of_stock");
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_invalid_order_transition_rejected() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let product = ctx.create_product(&admin, 5, "10.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .bearer_auth(&customer.token)
        .json(&json!({
            "items": [{ "productId": product_id, "quantity": 1 }],
            "shippingAddress": pomelo_integration_tests::shipping_address(),
        }))
        .send()
        .await
        .expect("order request failed");
    let body: Value = resp.json().await.expect("order response not JSON");
    let order_id = body["order"]["id"].as_i64().expect("order id missing");

    // pending -> delivered skips the state machine
    let resp = ctx
        .client
        .patch(ctx.url(&format!("/api/admin/orders/{order_id}/status")))
        .bearer_auth(&admin)
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .expect("status update failed");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_dashboard_and_stats_shapes() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/dashboard/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("dashboard request failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("dashboard response not JSON");
    assert!(body["products"]["total"].is_number());
    assert!(body["orders"]["total"].is_number());
    assert!(body["totalCustomers"].is_number());

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/orders/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("order stats request failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("stats response not JSON");
    assert!(body["byStatus"]["pending"].is_number());
    assert!(body["recentOrders"].is_array());

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/products/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("product stats request failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("stats response not JSON");
    assert!(body["byCategory"].is_array());
}
