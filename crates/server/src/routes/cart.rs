//! Cart routes. All operate on the authenticated caller's own cart.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pomelo_core::ProductId;

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::CartEntry;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(get_cart).post(add_item).put(update_item).delete(clear))
        .route("/api/cart/{product_id}", delete(remove_item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub items: Vec<CartEntry>,
    pub total: Decimal,
}

async fn cart_response(state: &AppState, user_id: pomelo_core::UserId) -> Result<Json<CartResponse>> {
    let items = CartRepository::new(state.pool()).entries(user_id).await?;
    let total = items.iter().map(CartEntry::line_total).sum();
    Ok(Json(CartResponse {
        success: true,
        items,
        total,
    }))
}

/// Look up the product and reject quantities the current stock cannot
/// cover.
async fn check_stock(
    state: &AppState,
    product_id: ProductId,
    quantity: i32,
) -> Result<()> {
    if quantity < 1 {
        return Err(ApiError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }

    let product = ProductRepository::new(state.pool())
        .get_visible(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not found")))?;

    if quantity > product.stock {
        return Err(ApiError::InsufficientStock(format!(
            "only {} of {} in stock",
            product.stock, product.name
        )));
    }

    Ok(())
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn get_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    cart_response(&state, user.id).await
}

#[instrument(skip_all, fields(user_id = %user.id, product_id = %body.product_id))]
async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    check_stock(&state, body.product_id, body.quantity).await?;

    // An existing line merges by addition; the combined quantity is checked
    // again at order time, not here.
    CartRepository::new(state.pool())
        .add(user.id, body.product_id, body.quantity)
        .await?;

    cart_response(&state, user.id).await
}

#[instrument(skip_all, fields(user_id = %user.id, product_id = %body.product_id))]
async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CartItemRequest>,
) -> Result<Json<CartResponse>> {
    check_stock(&state, body.product_id, body.quantity).await?;

    CartRepository::new(state.pool())
        .set_quantity(user.id, body.product_id, body.quantity)
        .await
        .map_err(|err| match err {
            RepositoryError::NotFound => {
                ApiError::NotFound("product is not in the cart".to_string())
            }
            other => other.into(),
        })?;

    cart_response(&state, user.id).await
}

#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    cart_response(&state, user.id).await
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    cart_response(&state, user.id).await
}
