//! Integration tests for signup, login, and profile routes.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p pomelo-server)
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use pomelo_integration_tests::{TestContext, unique_email};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_signup_then_login() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/users/login"))
        .json(&json!({ "email": session.email, "password": "correct-horse-battery" }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("login response not JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["role"], "customer");
    assert!(body["token"].is_string());
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_signup_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    let email = unique_email("dup");
    let payload = json!({
        "name": "First",
        "email": email,
        "password": "correct-horse-battery",
    });

    let first = ctx
        .client
        .post(ctx.url("/api/users/signup"))
        .json(&payload)
        .send()
        .await
        .expect("first signup failed");
    assert_eq!(first.status(), 201);

    let second = ctx
        .client
        .post(ctx.url("/api/users/signup"))
        .json(&payload)
        .send()
        .await
        .expect("second signup failed");
    assert_eq!(second.status(), 422);

    let body: Value = second.json().await.expect("error response not JSON");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_signup_rejects_short_password() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .post(ctx.url("/api/users/signup"))
        .json(&json!({
            "name": "Shorty",
            "email": unique_email("short"),
            "password": "seven77",
        }))
        .send()
        .await
        .expect("signup request failed");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_login_wrong_password_unauthorized() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/users/login"))
        .json(&json!({ "email": session.email, "password": "not-the-password" }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_me_requires_token() {
    let ctx = TestContext::new();

    let resp = ctx
        .client
        .get(ctx.url("/api/users/me"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 401);

    let session = ctx.signup_customer().await;
    let resp = ctx
        .client
        .get(ctx.url("/api/users/me"))
        .bearer_auth(&session.token)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("me response not JSON");
    assert_eq!(body["user"]["email"], session.email.as_str());
    // Password hashes never leave the server
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_add_address() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/users/addresses"))
        .bearer_auth(&session.token)
        .json(&json!({
            "street": "1 Test Street",
            "city": "Testville",
            "state": "TS",
            "zipCode": "00000",
            "country": "US",
            "isDefault": true,
        }))
        .send()
        .await
        .expect("address request failed");
    assert_eq!(resp.status(), 201);

    let resp = ctx
        .client
        .get(ctx.url("/api/users/me"))
        .bearer_auth(&session.token)
        .send()
        .await
        .expect("me request failed");
    let body: Value = resp.json().await.expect("me response not JSON");
    let addresses = body["addresses"].as_array().expect("addresses missing");
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0]["isDefault"], true);
}
