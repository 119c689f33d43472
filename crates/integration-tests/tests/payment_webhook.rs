//! Signed webhook deliveries: a replayed `checkout.session.completed`
//! event must settle on one order, one stock decrement.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p pomelo-server)
//! - A bootstrapped admin account (see the crate docs)
//! - `STRIPE_WEBHOOK_SECRET` matching the server's value
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use pomelo_integration_tests::{
    TestContext, decimal_field, shipping_address, stripe_signature, webhook_secret,
};
use serde_json::{Value, json};
use uuid::Uuid;

fn completed_session_event(session_id: &str, user_id: i64) -> String {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "payment_status": "paid",
                "metadata": {
                    "user_id": user_id.to_string(),
                    "shipping_address": shipping_address().to_string(),
                },
            }
        }
    })
    .to_string()
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_webhook_replay_creates_one_order() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let customer = ctx.signup_customer().await;

    let product = ctx.create_product(&admin, 5, "10.00").await;
    let product_id = product["id"].as_i64().expect("product id missing");

    // The webhook fulfills from the customer's cart
    let resp = ctx
        .client
        .post(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .json(&json!({ "productId": product_id, "quantity": 2 }))
        .send()
        .await
        .expect("cart request failed");
    assert_eq!(resp.status(), 200);

    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    let body = completed_session_event(&session_id, customer.user_id);
    let signature = stripe_signature(&webhook_secret(), &body);

    // Deliver the same signed event twice, as Stripe does on retry
    for _ in 0..2 {
        let resp = ctx
            .client
            .post(ctx.url("/api/payment/webhook"))
            .header("stripe-signature", &signature)
            .header("content-type", "application/json")
            .body(body.clone())
            .send()
            .await
            .expect("webhook request failed");
        assert_eq!(resp.status(), 200);
    }

    // Exactly one paid order for the customer
    let resp = ctx
        .client
        .get(ctx.url("/api/orders"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("orders request failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("orders response not JSON");

    let orders = body["orders"].as_array().expect("orders missing");
    assert_eq!(orders.len(), 1, "replay must not create a second order");
    assert_eq!(orders[0]["paymentStatus"], "paid");
    assert!((decimal_field(&orders[0]["totalAmount"]) - 20.0).abs() < f64::EPSILON);

    // Stock came down exactly once, and the cart is closed out
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{product_id}")))
        .send()
        .await
        .expect("product request failed");
    let body: Value = resp.json().await.expect("product response not JSON");
    assert_eq!(body["product"]["stock"], 3);

    let resp = ctx
        .client
        .get(ctx.url("/api/cart"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .expect("cart request failed");
    let body: Value = resp.json().await.expect("cart response not JSON");
    assert!(
        body["items"].as_array().expect("items missing").is_empty(),
        "fulfillment clears the cart"
    );
}
