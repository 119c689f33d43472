//! Catalog product model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use pomelo_core::{ProductCategory, ProductId, ProductStatus, UserId};

/// A catalog product.
///
/// `status` is derived from `stock` on every mutation path; see
/// [`ProductStatus::derive`]. Orders snapshot name/price/image at purchase
/// time and never reference these fields afterwards.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: ProductCategory,
    pub stock: i32,
    pub images: Vec<String>,
    pub sku: String,
    pub brand: Option<String>,
    pub rating_average: Decimal,
    pub rating_count: i32,
    pub featured: bool,
    pub status: ProductStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
