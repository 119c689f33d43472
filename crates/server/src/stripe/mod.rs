//! Stripe hosted checkout integration.
//!
//! The server never touches card data: it creates a Checkout Session,
//! redirects the customer to Stripe, and learns the outcome from signed
//! webhook events.

pub mod client;
pub mod webhook;

use thiserror::Error;

pub use client::{CheckoutLineItem, CheckoutSession, StripeClient};
pub use webhook::{Event, verify_signature};

/// Errors from the Stripe API or webhook verification.
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stripe api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}
