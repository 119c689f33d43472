//! HTTP route handlers.
//!
//! Public surface under `/api`, admin panel under `/api/admin`. Credential
//! endpoints sit behind the strict rate limiter, everything else behind
//! the general one.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod payment;
pub mod products;

use axum::Router;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Build the full API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::session_routes())
        .merge(products::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(payment::routes())
        .nest("/api/admin", admin::routes())
        .layer(api_rate_limiter())
        .merge(auth::credential_routes().layer(auth_rate_limiter()))
}
