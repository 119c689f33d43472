//! Integration tests for Pomelo.
//!
//! All tests hit a running server over HTTP and are `#[ignore]`d by default.
//!
//! # Running
//!
//! ```bash
//! # Start postgres and run migrations
//! cargo run -p pomelo-cli -- migrate
//!
//! # Bootstrap the admin the tests log in as
//! cargo run -p pomelo-cli -- admin create \
//!     -e admin@test.local -n "Test Admin" -p adminpassword
//!
//! # Start the server, then:
//! cargo test -p pomelo-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `POMELO_BASE_URL` - server address (default `http://localhost:5000`)
//! - `POMELO_TEST_ADMIN_EMAIL` / `POMELO_TEST_ADMIN_PASSWORD` - admin
//!   credentials (defaults match the bootstrap command above)
//! - `STRIPE_WEBHOOK_SECRET` - must match the server's value so the webhook
//!   tests can sign their deliveries (default `whsec_test`)

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use serde_json::{Value, json};
use uuid::Uuid;

/// A signed-up account with its bearer token.
pub struct Session {
    pub token: String,
    pub email: String,
    pub user_id: i64,
}

/// Shared handle for talking to the server under test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let base_url = std::env::var("POMELO_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        Self {
            client: Client::new(),
            base_url,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sign up a fresh customer account and return its session.
    ///
    /// # Panics
    ///
    /// Panics if the server rejects the signup.
    pub async fn signup_customer(&self) -> Session {
        let email = unique_email("customer");
        let resp = self
            .client
            .post(self.url("/api/users/signup"))
            .json(&json!({
                "name": "Integration Test",
                "email": email,
                "password": "correct-horse-battery",
            }))
            .send()
            .await
            .expect("signup request failed");
        assert_eq!(resp.status(), 201, "signup should succeed");

        let body: Value = resp.json().await.expect("signup response not JSON");
        Session {
            token: body["token"].as_str().expect("token missing").to_string(),
            email,
            user_id: body["userId"].as_i64().expect("userId missing"),
        }
    }

    /// Log in as the seeded admin account.
    ///
    /// # Panics
    ///
    /// Panics if the admin login fails (bootstrap the account first, see the
    /// crate docs).
    pub async fn admin_token(&self) -> String {
        let email = std::env::var("POMELO_TEST_ADMIN_EMAIL")
            .unwrap_or_else(|_| "admin@test.local".to_string());
        let password = std::env::var("POMELO_TEST_ADMIN_PASSWORD")
            .unwrap_or_else(|_| "adminpassword".to_string());

        let resp = self
            .client
            .post(self.url("/api/users/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("admin login request failed");
        assert_eq!(
            resp.status(),
            200,
            "admin login failed; run 'pomelo-cli admin create' first"
        );

        let body: Value = resp.json().await.expect("login response not JSON");
        body["token"].as_str().expect("token missing").to_string()
    }

    /// Create a product through the admin API and return its JSON.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn create_product(&self, admin_token: &str, stock: i32, price: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/admin/products"))
            .bearer_auth(admin_token)
            .json(&json!({
                "name": "Test Product",
                "description": "Created by an integration test",
                "price": price,
                "category": "Other",
                "stock": stock,
                "sku": unique_sku(),
            }))
            .send()
            .await
            .expect("create product request failed");
        assert_eq!(resp.status(), 201, "product creation should succeed");

        let body: Value = resp.json().await.expect("create response not JSON");
        body["product"].clone()
    }
}

/// A unique email address per test run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@test.local", Uuid::new_v4())
}

/// A unique SKU per test run.
#[must_use]
pub fn unique_sku() -> String {
    format!("TEST-{}", Uuid::new_v4())
}

/// A throwaway shipping address for order placement.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "street": "1 Test Street",
        "city": "Testville",
        "state": "TS",
        "zipCode": "00000",
        "country": "US",
    })
}

/// Parse a decimal string field (prices come over the wire as strings).
///
/// # Panics
///
/// Panics if the field is not a parseable decimal string.
#[must_use]
pub fn decimal_field(value: &Value) -> f64 {
    value
        .as_str()
        .expect("expected a decimal string")
        .parse()
        .expect("expected a parseable decimal")
}

/// The webhook signing secret the server under test is configured with.
#[must_use]
pub fn webhook_secret() -> String {
    std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| "whsec_test".to_string())
}

/// Build a `Stripe-Signature` header for `body`, signed the way Stripe
/// signs deliveries (`v1` HMAC-SHA256 over `"{timestamp}.{body}"`).
///
/// # Panics
///
/// Panics if the system clock is before the Unix epoch.
#[must_use]
pub fn stripe_signature(secret: &str, body: &str) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs();

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
