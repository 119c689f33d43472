//! Stripe payment bridge: checkout session creation, the webhook, and
//! session status lookup.
//!
//! The webhook funnels through the same transactional order-creation path
//! as direct placement, with the checkout session id as idempotency key,
//! so replayed deliveries never create a second order.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use pomelo_core::{PaymentMethod, PaymentStatus, UserId};

use crate::db::{
    CartRepository, OrderRepository,
    orders::{NewOrder, OrderLine},
};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::ShippingAddress;
use crate::state::AppState;
use crate::stripe::{CheckoutLineItem, CheckoutSession, Event, verify_signature};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payment/create-checkout-session", post(create_session))
        .route("/api/payment/webhook", post(webhook))
        .route("/api/payment/status/{session_id}", get(session_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub shipping_address: ShippingAddress,
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn create_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<serde_json::Value>> {
    let entries = CartRepository::new(state.pool()).entries(user.id).await?;
    if entries.is_empty() {
        return Err(ApiError::InvalidState("cart is empty".to_string()));
    }

    for entry in &entries {
        if entry.quantity > entry.stock {
            return Err(ApiError::InsufficientStock(format!(
                "only {} of {} in stock",
                entry.stock, entry.name
            )));
        }
    }

    let items: Vec<CheckoutLineItem> = entries
        .iter()
        .map(|entry| CheckoutLineItem {
            name: entry.name.clone(),
            unit_price: entry.price,
            quantity: entry.quantity,
            image: entry.image.clone(),
        })
        .collect();

    let shipping = serde_json::to_string(&body.shipping_address)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let metadata = vec![
        ("user_id".to_string(), user.id.to_string()),
        ("shipping_address".to_string(), shipping),
    ];

    let client_url = &state.config().client_url;
    let session = state
        .stripe()
        .create_checkout_session(
            &items,
            &format!("{client_url}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"),
            &format!("{client_url}/payment/cancel"),
            &metadata,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "sessionId": session.id,
        "url": session.url,
    })))
}

#[instrument(skip_all)]
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unverified("missing Stripe-Signature header".to_string()))?;

    verify_signature(
        signature,
        &body,
        &state.config().stripe.webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| ApiError::Unverified(e.to_string()))?;

    let event = Event::parse(&body)
        .map_err(|e| ApiError::InvalidInput(format!("malformed event: {e}")))?;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session = event.checkout_session().ok_or_else(|| {
                ApiError::InvalidInput("event carries no checkout session".to_string())
            })?;

            // A verified payment must not bounce back to Stripe as a 5xx;
            // failures here are operational and go to the log and Sentry.
            if let Err(err) = fulfill_session(&state, session).await {
                tracing::error!(
                    session_id = %session.id,
                    error = %err,
                    "Failed to create order for paid checkout session"
                );
                sentry::capture_error(&err);
            }
        }
        "checkout.session.expired" => {
            tracing::info!(event_id = %event.id, "Checkout session expired");
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring webhook event");
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// Create the order a paid checkout session stands for.
///
/// Idempotent on the session id: a replayed delivery finds the existing
/// order inside `OrderRepository::create` and returns it unchanged.
async fn fulfill_session(state: &AppState, session: &CheckoutSession) -> Result<()> {
    let user_id = session
        .metadata
        .get("user_id")
        .and_then(|v| v.parse::<i32>().ok())
        .map(UserId::new)
        .ok_or_else(|| ApiError::InvalidInput("session metadata lacks user_id".to_string()))?;

    let shipping_address: ShippingAddress = session
        .metadata
        .get("shipping_address")
        .and_then(|v| serde_json::from_str(v).ok())
        .ok_or_else(|| {
            ApiError::InvalidInput("session metadata lacks shipping_address".to_string())
        })?;

    let entries = CartRepository::new(state.pool()).entries(user_id).await?;
    let lines: Vec<OrderLine> = entries
        .iter()
        .map(|entry| OrderLine {
            product_id: entry.product_id,
            quantity: entry.quantity,
        })
        .collect();

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            customer_id: user_id,
            lines,
            shipping_address,
            payment_method: PaymentMethod::CreditCard,
            payment_status: PaymentStatus::Paid,
            notes: None,
            checkout_session_id: Some(session.id.clone()),
        })
        .await?;

    tracing::info!(
        order_number = %order.order_number,
        session_id = %session.id,
        "Order created from checkout session"
    );
    Ok(())
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn session_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let session = state.stripe().get_checkout_session(&session_id).await?;

    Ok(Json(json!({
        "success": true,
        "status": session.payment_status,
        "customerEmail": session.customer_details.as_ref().and_then(|d| d.email.clone()),
        "amountTotal": session.amount_total,
    })))
}
