//! Public catalog routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pomelo_core::{ProductCategory, ProductId, ProductStatus};

use crate::db::{ProductRepository, products::{ProductFilter, ProductSort}};
use crate::error::{ApiError, Result};
use crate::models::Product;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 100;
const FEATURED_LIMIT: i64 = 8;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list))
        .route("/api/products/featured", get(featured))
        .route("/api/products/categories", get(categories))
        .route("/api/products/{id}", get(get_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<Product>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_products: i64,
}

/// Clamp page/limit to sane bounds and return (limit, offset, page).
pub(crate) fn pagination(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
    (limit, (page - 1) * limit, page)
}

pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    // Signed div_ceil is not stable; limit is always >= 1 here.
    ((total + limit - 1) / limit).max(1)
}

fn parse_sort(sort: Option<&str>) -> ProductSort {
    match sort {
        Some("price_asc") => ProductSort::PriceAsc,
        Some("price_desc") => ProductSort::PriceDesc,
        Some("rating") => ProductSort::Rating,
        _ => ProductSort::Newest,
    }
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductListResponse>> {
    let (limit, offset, page) = pagination(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
        featured: query.featured,
        status: Some(ProductStatus::Active),
    };

    let repo = ProductRepository::new(state.pool());
    let products = repo
        .list(&filter, parse_sort(query.sort.as_deref()), limit, offset)
        .await?;
    let total = repo.count(&filter).await?;

    Ok(Json(ProductListResponse {
        success: true,
        products,
        current_page: page,
        total_pages: total_pages(total, limit),
        total_products: total,
    }))
}

#[instrument(skip_all)]
async fn featured(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let filter = ProductFilter {
        featured: Some(true),
        status: Some(ProductStatus::Active),
        ..ProductFilter::default()
    };
    let products = ProductRepository::new(state.pool())
        .list(&filter, ProductSort::Newest, FEATURED_LIMIT, 0)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "products": products,
    })))
}

#[instrument(skip_all)]
async fn categories(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let categories = ProductRepository::new(state.pool())
        .categories_in_use()
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "categories": categories,
    })))
}

#[instrument(skip_all, fields(product_id = %id))]
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    let product = ProductRepository::new(state.pool())
        .get_visible(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "product": product,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamps() {
        assert_eq!(pagination(None, None, 12), (12, 0, 1));
        assert_eq!(pagination(Some(3), Some(10), 12), (10, 20, 3));
        assert_eq!(pagination(Some(0), Some(1000), 12), (100, 0, 1));
        assert_eq!(pagination(Some(-5), Some(0), 12), (1, 0, 1));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 12), 1);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort(Some("price_asc")), ProductSort::PriceAsc);
        assert_eq!(parse_sort(Some("bogus")), ProductSort::Newest);
        assert_eq!(parse_sort(None), ProductSort::Newest);
    }
}
