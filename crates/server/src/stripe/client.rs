//! Stripe Checkout Session API client.
//!
//! The REST API takes form-encoded bodies with bracketed array keys
//! (`line_items[0][quantity]`), so params are built as flat key/value
//! pairs.

use std::collections::HashMap;

use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::StripeError;
use crate::config::StripeConfig;

const API_BASE: &str = "https://api.stripe.com/v1";

/// One purchasable line on a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Unit price in major currency units.
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

/// A Stripe Checkout Session, as returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page; present on freshly created sessions.
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

/// Customer contact details Stripe collected during checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSession {
    /// Whether Stripe reports this session as paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Build a client from the configured API keys.
    #[must_use]
    pub fn new(http: Client, config: StripeConfig) -> Self {
        Self { http, config }
    }

    /// Create a hosted checkout session for the given line items.
    ///
    /// `metadata` round-trips through Stripe and comes back on the
    /// webhook event; the order is reconstructed from it.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` when Stripe rejects the request.
    #[instrument(skip_all, fields(lines = items.len()))]
    pub async fn create_checkout_session(
        &self,
        items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
        metadata: &[(String, String)],
    ) -> Result<CheckoutSession, StripeError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), success_url.into()),
            ("cancel_url".into(), cancel_url.into()),
        ];

        for (i, item) in items.iter().enumerate() {
            params.push((
                format!("line_items[{i}][price_data][currency]"),
                self.config.currency.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(image) = &item.image {
                params.push((
                    format!("line_items[{i}][price_data][product_data][images][0]"),
                    image.clone(),
                ));
            }
            params.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                minor_units(item.unit_price).to_string(),
            ));
            params.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
        }

        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        let session = self
            .post_form("/checkout/sessions", &params)
            .await?;
        debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }

    /// Retrieve an existing checkout session.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` for an unknown session id.
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .http
            .get(format!("{API_BASE}/checkout/sessions/{session_id}"))
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .http
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<CheckoutSession, StripeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|body| body.error.message)
            .unwrap_or_default();
        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Convert a major-unit price to Stripe's integer minor units.
fn minor_units(price: Decimal) -> i64 {
    (price * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units(dec!(19.99)), 1999);
        assert_eq!(minor_units(dec!(0.50)), 50);
        assert_eq!(minor_units(dec!(100)), 10000);
    }

    #[test]
    fn test_session_is_paid() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_123",
            "url": null,
            "payment_status": "paid",
            "amount_total": 1999,
            "metadata": { "user_id": "1" }
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.metadata.get("user_id").unwrap(), "1");
    }
}
