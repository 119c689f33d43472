//! Product repository for catalog persistence and inventory adjustments.

use rust_decimal::Decimal;
use sqlx::PgPool;

use pomelo_core::{ProductCategory, ProductId, ProductStatus, StockOperation, UserId};

use super::RepositoryError;
use crate::models::Product;

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, stock, images, sku, \
                               brand, rating_average, rating_count, featured, status, \
                               created_by, created_at, updated_at";

/// Sort order for public catalog listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC",
            Self::PriceAsc => "price ASC",
            Self::PriceDesc => "price DESC",
            Self::Rating => "rating_average DESC, rating_count DESC",
        }
    }
}

/// Filter for catalog listings. All fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    /// Case-insensitive match against name, description, and brand.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    /// Admin listings pass a status filter; the public listing pins `active`.
    pub status: Option<ProductStatus>,
}

/// Field-by-field product update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub brand: Option<Option<String>>,
    pub featured: Option<bool>,
    pub status: Option<ProductStatus>,
}

/// Parameters for creating a catalog entry.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: ProductCategory,
    pub stock: i32,
    pub images: Vec<String>,
    pub sku: String,
    pub brand: Option<String>,
    pub featured: bool,
    pub created_by: UserId,
}

/// Inventory counters for the admin dashboard.
#[derive(Debug, Clone, Copy)]
pub struct InventoryStats {
    pub total_products: i64,
    pub active: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = filter.search.as_deref().map(|s| format!("%{s}%"));
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::text IS NULL OR category = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2 OR brand ILIKE $2)
               AND ($3::numeric IS NULL OR price >= $3)
               AND ($4::numeric IS NULL OR price <= $4)
               AND ($5::boolean IS NULL OR featured = $5)
               AND ($6::text IS NULL OR status = $6)
             ORDER BY {order_by}
             LIMIT $7 OFFSET $8",
            order_by = sort.order_by(),
        ))
        .bind(filter.category.map(|c| c.as_str()))
        .bind(pattern)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Count products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let pattern = filter.search.as_deref().map(|s| format!("%{s}%"));
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM products
             WHERE ($1::text IS NULL OR category = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2 OR brand ILIKE $2)
               AND ($3::numeric IS NULL OR price >= $3)
               AND ($4::numeric IS NULL OR price <= $4)
               AND ($5::boolean IS NULL OR featured = $5)
               AND ($6::text IS NULL OR status = $6)",
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(pattern)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_one(self.pool)
        .await?;

        Ok(count.0)
    }

    /// Get a product by ID regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product by ID, visible only when not inactive.
    ///
    /// Out-of-stock products stay visible on the storefront; hidden ones
    /// do not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_visible(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status <> 'inactive'"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Create a catalog entry. Status is derived from the initial stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU already exists.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let status = ProductStatus::Active.derive(new.stock);
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products
                 (name, description, price, category, stock, images, sku, brand,
                  featured, status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.category.as_str())
        .bind(new.stock)
        .bind(&new.images)
        .bind(&new.sku)
        .bind(new.brand.as_deref())
        .bind(new.featured)
        .bind(status.as_str())
        .bind(new.created_by)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "sku already exists"))?;

        Ok(product)
    }

    /// Apply a field-by-field update.
    ///
    /// An explicit status update wins over the stock-derived one, except
    /// that `active` on a zero-stock product still reads back as
    /// `out_of_stock`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let stock = update.stock.unwrap_or(current.stock);
        let status = update.status.unwrap_or(current.status).derive(stock);

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 category = COALESCE($5, category),
                 stock = $6,
                 images = COALESCE($7, images),
                 brand = CASE WHEN $8 THEN $9 ELSE brand END,
                 featured = COALESCE($10, featured),
                 status = $11,
                 updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.category.map(|c| c.as_str()))
        .bind(stock)
        .bind(update.images.as_deref())
        .bind(update.brand.is_some())
        .bind(update.brand.clone().flatten())
        .bind(update.featured)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Adjust stock by `amount` in the given direction, rederiving status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist and
    /// `RepositoryError::Conflict` if a subtraction would go negative.
    pub async fn adjust_stock(
        &self,
        id: ProductId,
        operation: StockOperation,
        amount: i32,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let new_stock = match operation {
            StockOperation::Add => current.stock.saturating_add(amount),
            StockOperation::Subtract => {
                let remaining = current.stock - amount;
                if remaining < 0 {
                    return Err(RepositoryError::Conflict(format!(
                        "cannot remove {amount} units, only {} in stock",
                        current.stock
                    )));
                }
                remaining
            }
        };
        let status = current.status.derive(new_stock);

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET stock = $2, status = $3, updated_at = now()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(new_stock)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Remove a product from the catalog.
    ///
    /// Products referenced by historical orders cannot be deleted; they are
    /// hidden instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(()),
            Ok(_) => Err(RepositoryError::NotFound),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                sqlx::query(
                    "UPDATE products SET status = 'inactive', updated_at = now() WHERE id = $1",
                )
                .bind(id)
                .execute(self.pool)
                .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Inventory counters for the admin dashboard.
    ///
    /// Low stock means between 1 and 10 units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inventory_stats(&self) -> Result<InventoryStats, RepositoryError> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'active'),
                    COUNT(*) FILTER (WHERE stock BETWEEN 1 AND 10),
                    COUNT(*) FILTER (WHERE stock = 0)
             FROM products
             WHERE status <> 'inactive'",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(InventoryStats {
            total_products: row.0,
            active: row.1,
            low_stock: row.2,
            out_of_stock: row.3,
        })
    }

    /// Product counts per category, skipping hidden products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_counts(&self) -> Result<Vec<(String, i64)>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM products
             WHERE status <> 'inactive'
             GROUP BY category
             ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct categories with at least one visible product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_in_use(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT category FROM products
             WHERE status <> 'inactive'
             ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(c,)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_by_clauses() {
        assert_eq!(ProductSort::Newest.order_by(), "created_at DESC");
        assert_eq!(ProductSort::PriceAsc.order_by(), "price ASC");
        assert_eq!(ProductSort::PriceDesc.order_by(), "price DESC");
    }

    #[test]
    fn test_default_filter_is_unconstrained() {
        let filter = ProductFilter::default();
        assert!(filter.category.is_none());
        assert!(filter.search.is_none());
        assert!(filter.status.is_none());
    }
}
