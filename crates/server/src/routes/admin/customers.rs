//! Admin customer listing.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use pomelo_core::UserId;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::products::{pagination, total_pages};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list))
        .route("/customers/{id}", get(get_one))
}

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<serde_json::Value>> {
    let (limit, offset, page) = pagination(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let repo = UserRepository::new(state.pool());

    let customers = repo
        .list_customers(query.search.as_deref(), limit, offset)
        .await?;
    let total = repo.count_customers(query.search.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "customers": customers,
        "currentPage": page,
        "totalPages": total_pages(total, limit),
        "totalCustomers": total,
    })))
}

#[instrument(skip_all, fields(customer_id = %id))]
async fn get_one(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>> {
    let customer = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("customer {id} not found")))?;

    let stats = OrderRepository::new(state.pool()).customer_stats(id).await?;

    Ok(Json(json!({
        "success": true,
        "customer": customer,
        "orderCount": stats.order_count,
        "totalSpent": stats.total_spent,
    })))
}
