//! Order routes: placement, history, and cancellation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use pomelo_core::{OrderId, PaymentMethod, PaymentStatus, ProductId, Role};

use crate::db::{
    OrderRepository,
    orders::{NewOrder, OrderLine},
};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, ShippingAddress};
use crate::routes::products::{pagination, total_pages};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create).get(list))
        .route("/api/orders/{id}", get(get_one))
        .route("/api/orders/{id}/cancel", patch(cancel))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<Order>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_orders: i64,
}

/// Validate request lines before touching the database.
fn validate_lines(items: &[OrderItemRequest]) -> Result<Vec<OrderLine>> {
    if items.is_empty() {
        return Err(ApiError::InvalidInput("order has no items".to_string()));
    }
    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(ApiError::InvalidInput(
                    "quantity must be at least 1".to_string(),
                ));
            }
            Ok(OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
        })
        .collect()
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let lines = validate_lines(&body.items)?;

    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            customer_id: user.id,
            lines,
            shipping_address: body.shipping_address,
            payment_method: body.payment_method,
            payment_status: PaymentStatus::Pending,
            notes: body.notes,
            checkout_session_id: None,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "order": order })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[instrument(skip_all, fields(user_id = %user.id))]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>> {
    let (limit, offset, page) = pagination(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let repo = OrderRepository::new(state.pool());

    let orders = repo.list_for_customer(user.id, limit, offset).await?;
    let total = repo.count_for_customer(user.id).await?;

    Ok(Json(OrderListResponse {
        success: true,
        orders,
        current_page: page,
        total_pages: total_pages(total, limit),
        total_orders: total,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
async fn get_one(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    let order = OrderRepository::new(state.pool())
        .get(id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    if order.customer_id != user.id && user.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "order belongs to another customer".to_string(),
        ));
    }

    Ok(Json(json!({ "success": true, "order": order })))
}

#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get(id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    if order.customer_id != user.id {
        return Err(ApiError::Forbidden(
            "order belongs to another customer".to_string(),
        ));
    }

    let cancelled = repo.cancel(id, Some(user.id)).await?;
    Ok(Json(json!({ "success": true, "order": cancelled })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lines_rejects_empty_and_zero() {
        assert!(validate_lines(&[]).is_err());
        assert!(
            validate_lines(&[OrderItemRequest {
                product_id: ProductId::new(1),
                quantity: 0,
            }])
            .is_err()
        );
    }

    #[test]
    fn test_validate_lines_passes_through() {
        let lines = validate_lines(&[OrderItemRequest {
            product_id: ProductId::new(2),
            quantity: 3,
        }])
        .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }
}
