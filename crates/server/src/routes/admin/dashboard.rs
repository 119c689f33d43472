//! Admin dashboard aggregates: one payload with product, order, revenue,
//! and customer counters.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::json;
use tracing::instrument;

use crate::db::{OrderRepository, ProductRepository, UserRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(stats))
}

#[instrument(skip_all)]
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let pool = state.pool();
    let inventory = ProductRepository::new(pool).inventory_stats().await?;
    let sales = OrderRepository::new(pool).sales_stats().await?;
    let customers = UserRepository::new(pool).count_customers(None).await?;

    Ok(Json(json!({
        "success": true,
        "products": {
            "total": inventory.total_products,
            "active": inventory.active,
            "lowStock": inventory.low_stock,
            "outOfStock": inventory.out_of_stock,
        },
        "orders": {
            "total": sales.total_orders,
            "pending": sales.pending,
            "processing": sales.processing,
            "shipped": sales.shipped,
            "delivered": sales.delivered,
            "cancelled": sales.cancelled,
        },
        "totalRevenue": sales.total_revenue,
        "totalCustomers": customers,
    })))
}
