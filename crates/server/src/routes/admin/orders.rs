//! Admin order management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use pomelo_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::products::{pagination, total_pages};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const RECENT_ORDERS: i64 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/stats", get(stats))
        .route("/orders/{id}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<serde_json::Value>> {
    let (limit, offset, page) = pagination(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let repo = OrderRepository::new(state.pool());

    let orders = repo
        .list_all(query.status, query.search.as_deref(), limit, offset)
        .await?;
    let total = repo.count_all(query.status, query.search.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "orders": orders,
        "currentPage": page,
        "totalPages": total_pages(total, limit),
        "totalOrders": total,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[instrument(skip_all, fields(order_id = %id, new_status = %body.status))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status)
        .await?;

    Ok(Json(json!({ "success": true, "order": order })))
}

#[instrument(skip_all)]
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let repo = OrderRepository::new(state.pool());
    let sales = repo.sales_stats().await?;
    let recent = repo.recent(RECENT_ORDERS).await?;

    Ok(Json(json!({
        "success": true,
        "totalOrders": sales.total_orders,
        "totalRevenue": sales.total_revenue,
        "byStatus": {
            "pending": sales.pending,
            "processing": sales.processing,
            "shipped": sales.shipped,
            "delivered": sales.delivered,
            "cancelled": sales.cancelled,
        },
        "recentOrders": recent,
    })))
}
