//! Admin catalog management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use pomelo_core::{ProductCategory, ProductId, ProductStatus, StockOperation};

use crate::db::{
    ProductRepository,
    products::{NewProduct, ProductFilter, ProductSort, ProductUpdate},
};
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::products::{pagination, total_pages};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/stats", get(stats))
        .route("/products/stock", patch(adjust_stock))
        .route("/products/{id}", put(update).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListQuery {
    pub category: Option<ProductCategory>,
    pub status: Option<ProductStatus>,
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
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
        status: query.status,
        ..ProductFilter::default()
    };

    let repo = ProductRepository::new(state.pool());
    let products = repo.list(&filter, ProductSort::Newest, limit, offset).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(json!({
        "success": true,
        "products": products,
        "currentPage": page,
        "totalPages": total_pages(total, limit),
        "totalProducts": total,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: ProductCategory,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    pub sku: String,
    pub brand: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

fn validate_new_product(body: &CreateProductRequest) -> Result<()> {
    if body.name.trim().is_empty() {
        return Err(ApiError::InvalidInput("name must not be empty".to_string()));
    }
    if body.sku.trim().is_empty() {
        return Err(ApiError::InvalidInput("sku must not be empty".to_string()));
    }
    if body.price < Decimal::ZERO {
        return Err(ApiError::InvalidInput(
            "price must not be negative".to_string(),
        ));
    }
    if body.stock < 0 {
        return Err(ApiError::InvalidInput(
            "stock must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[instrument(skip_all, fields(sku = %body.sku))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    validate_new_product(&body)?;

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            name: body.name,
            description: body.description,
            price: body.price,
            category: body.category,
            stock: body.stock,
            images: body.images,
            sku: body.sku,
            brand: body.brand,
            featured: body.featured,
            created_by: admin.id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": product })),
    ))
}

/// Explicit field-by-field update. Absent fields stay untouched; there is
/// deliberately no way to write arbitrary columns.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub brand: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<ProductStatus>,
}

#[instrument(skip_all, fields(product_id = %id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(ApiError::InvalidInput(
            "price must not be negative".to_string(),
        ));
    }
    if body.stock.is_some_and(|s| s < 0) {
        return Err(ApiError::InvalidInput(
            "stock must not be negative".to_string(),
        ));
    }

    let update = ProductUpdate {
        name: body.name,
        description: body.description,
        price: body.price,
        category: body.category,
        stock: body.stock,
        images: body.images,
        brand: body.brand.map(Some),
        featured: body.featured,
        status: body.status,
    };

    let product = ProductRepository::new(state.pool()).update(id, &update).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

#[instrument(skip_all, fields(product_id = %id))]
async fn delete_one(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    ProductRepository::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    pub operation: StockOperation,
}

#[instrument(skip_all, fields(product_id = %body.product_id))]
async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<StockAdjustRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.quantity < 1 {
        return Err(ApiError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }

    let product = ProductRepository::new(state.pool())
        .adjust_stock(body.product_id, body.operation, body.quantity)
        .await
        .map_err(|err| match err {
            crate::db::RepositoryError::Conflict(message) => ApiError::InsufficientStock(message),
            other => other.into(),
        })?;

    Ok(Json(json!({ "success": true, "product": product })))
}

#[instrument(skip_all)]
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let repo = ProductRepository::new(state.pool());
    let inventory = repo.inventory_stats().await?;
    let by_category: Vec<serde_json::Value> = repo
        .category_counts()
        .await?
        .into_iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "totalProducts": inventory.total_products,
        "activeProducts": inventory.active,
        "lowStock": inventory.low_stock,
        "outOfStock": inventory.out_of_stock,
        "byCategory": by_category,
    })))
}
