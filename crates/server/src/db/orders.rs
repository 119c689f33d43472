//! Order repository. Order creation and cancellation are single
//! transactions that lock the affected product rows, so stock never goes
//! negative under concurrent checkouts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use pomelo_core::{
    OrderId, OrderItemId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    ProductStatus, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem, ShippingAddress};

/// One requested line of a new order.
#[derive(Debug, Clone, Copy)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Parameters for creating an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    /// Present on the webhook path; the idempotency key.
    pub checkout_session_id: Option<String>,
}

/// Failures specific to order creation.
#[derive(Debug, Error)]
pub enum CreateOrderError {
    #[error("order has no items")]
    Empty,

    #[error("product {0} is unavailable")]
    ProductUnavailable(ProductId),

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("total quantity requested for product {0} is too large")]
    QuantityTooLarge(ProductId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CreateOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

/// Failures specific to order cancellation.
#[derive(Debug, Error)]
pub enum CancelOrderError {
    #[error("order not found")]
    NotFound,

    #[error("order cannot be cancelled from status {0}")]
    NotCancellable(OrderStatus),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CancelOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

/// Per-status order counts and revenue for the admin dashboard.
///
/// Revenue counts orders that are being fulfilled or done, not pending or
/// cancelled ones.
#[derive(Debug, Clone, Copy)]
pub struct SalesStats {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub pending: i64,
    pub processing: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub cancelled: i64,
}

/// Per-customer aggregates for the admin customer listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerStats {
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    customer_id: UserId,
    total_amount: Decimal,
    status: OrderStatus,
    shipping_street: String,
    shipping_city: String,
    shipping_state: String,
    shipping_zip_code: String,
    shipping_country: String,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    notes: Option<String>,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            customer_id: self.customer_id,
            items,
            total_amount: self.total_amount,
            status: self.status,
            shipping_address: ShippingAddress {
                street: self.shipping_street,
                city: self.shipping_city,
                state: self.shipping_state,
                zip_code: self.shipping_zip_code,
                country: self.shipping_country,
            },
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            notes: self.notes,
            checkout_session_id: self.checkout_session_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: OrderId,
    id: OrderItemId,
    product_id: ProductId,
    name: String,
    quantity: i32,
    price: Decimal,
    image: String,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LockedProduct {
    name: String,
    price: Decimal,
    stock: i32,
    status: ProductStatus,
    image: Option<String>,
}

const ORDER_COLUMNS: &str = "id, order_number, customer_id, total_amount, status, \
                             shipping_street, shipping_city, shipping_state, \
                             shipping_zip_code, shipping_country, payment_status, \
                             payment_method, notes, checkout_session_id, created_at, \
                             updated_at";

const ITEM_COLUMNS: &str = "order_id, id, product_id, name, quantity, price, image";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an order in one transaction.
    ///
    /// Locks each product row, verifies stock, decrements it, snapshots
    /// name/price/image into line items, and clears the customer's cart.
    /// Either everything commits or nothing does.
    ///
    /// When `checkout_session_id` is set and an order for that session
    /// already exists, the existing order is returned instead of creating
    /// a second one.
    ///
    /// # Errors
    ///
    /// Returns `CreateOrderError::InsufficientStock` or
    /// `CreateOrderError::ProductUnavailable` when a line cannot be
    /// fulfilled; the transaction is rolled back in full.
    pub async fn create(&self, new: &NewOrder) -> Result<Order, CreateOrderError> {
        // Idempotency first: on a replay the cart is already cleared, so
        // the existing order must win before the empty-lines check.
        if let Some(session_id) = new.checkout_session_id.as_deref() {
            if let Some(existing) = self.get_by_checkout_session(session_id).await? {
                return Ok(existing);
            }
        }

        let lines = merge_lines(&new.lines)?;
        if lines.is_empty() {
            return Err(CreateOrderError::Empty);
        }

        let mut tx = self.pool.begin().await?;

        let mut total = Decimal::ZERO;
        let mut snapshots = Vec::with_capacity(lines.len());

        // Rows lock in ascending product id so concurrent checkouts cannot
        // deadlock each other.
        for line in &lines {
            let product = sqlx::query_as::<_, LockedProduct>(
                "SELECT name, price, stock, status, images[1] AS image
                 FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CreateOrderError::ProductUnavailable(line.product_id))?;

            if product.status == ProductStatus::Inactive {
                return Err(CreateOrderError::ProductUnavailable(line.product_id));
            }
            if product.stock < line.quantity {
                return Err(CreateOrderError::InsufficientStock {
                    product_id: line.product_id,
                    name: product.name,
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            let remaining = product.stock - line.quantity;
            let status = product.status.derive(remaining);
            sqlx::query(
                "UPDATE products SET stock = $2, status = $3, updated_at = now() WHERE id = $1",
            )
            .bind(line.product_id)
            .bind(remaining)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

            total += product.price * Decimal::from(line.quantity);
            snapshots.push((line.product_id, line.quantity, product));
        }

        let order_number = OrderNumber::generate();
        let inserted = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders
                 (order_number, customer_id, total_amount, status,
                  shipping_street, shipping_city, shipping_state,
                  shipping_zip_code, shipping_country,
                  payment_status, payment_method, notes, checkout_session_id)
             VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_number.as_str())
        .bind(new.customer_id)
        .bind(total)
        .bind(&new.shipping_address.street)
        .bind(&new.shipping_address.city)
        .bind(&new.shipping_address.state)
        .bind(&new.shipping_address.zip_code)
        .bind(&new.shipping_address.country)
        .bind(new.payment_status)
        .bind(new.payment_method)
        .bind(new.notes.as_deref())
        .bind(new.checkout_session_id.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) => {
                // A concurrent webhook delivery for the same session won the
                // race; drop our transaction and hand back its order.
                let mapped = RepositoryError::from_sqlx(err, "duplicate checkout session");
                if let (RepositoryError::Conflict(_), Some(session_id)) =
                    (&mapped, new.checkout_session_id.as_deref())
                {
                    drop(tx);
                    if let Some(existing) = self.get_by_checkout_session(session_id).await? {
                        return Ok(existing);
                    }
                }
                return Err(mapped.into());
            }
        };

        let mut items = Vec::with_capacity(snapshots.len());
        for (product_id, quantity, product) in snapshots {
            let item = sqlx::query_as::<_, ItemRow>(&format!(
                "INSERT INTO order_items (order_id, product_id, name, quantity, price, image)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(row.id)
            .bind(product_id)
            .bind(&product.name)
            .bind(quantity)
            .bind(product.price)
            .bind(product.image.as_deref().unwrap_or_default())
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item));
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(new.customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into_order(items))
    }

    /// Cancel an order and put its stock back.
    ///
    /// Only pending and processing orders can be cancelled. Restocked
    /// products become visible again; a paid order is marked refunded.
    ///
    /// # Errors
    ///
    /// Returns `CancelOrderError::NotCancellable` if the order is already
    /// shipped, delivered, or cancelled.
    pub async fn cancel(
        &self,
        order_id: OrderId,
        customer_id: Option<UserId>,
    ) -> Result<Order, CancelOrderError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE id = $1 AND ($2::int IS NULL OR customer_id = $2)
             FOR UPDATE"
        ))
        .bind(order_id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CancelOrderError::NotFound)?;

        if !row.status.is_cancellable() {
            return Err(CancelOrderError::NotCancellable(row.status));
        }

        restock_items(&mut tx, order_id).await?;

        let payment_status = if row.payment_status == PaymentStatus::Paid {
            PaymentStatus::Refunded
        } else {
            row.payment_status
        };

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders
             SET status = 'cancelled', payment_status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(payment_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let items = self.items_for(order_id).await?;
        Ok(updated.into_order(items))
    }

    /// Move an order to a new fulfillment status.
    ///
    /// Transitions are validated against the status state machine; a move
    /// to `cancelled` goes through the restocking path.
    ///
    /// # Errors
    ///
    /// Returns `CancelOrderError::NotCancellable` for an illegal transition.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, CancelOrderError> {
        if new_status == OrderStatus::Cancelled {
            return self.cancel(order_id, None).await;
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CancelOrderError::NotFound)?;

        if !row.status.can_transition_to(new_status) {
            return Err(CancelOrderError::NotCancellable(row.status));
        }

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let items = self.items_for(order_id).await?;
        Ok(updated.into_order(items))
    }

    /// Get an order with its items, optionally scoped to a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        order_id: OrderId,
        customer_id: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE id = $1 AND ($2::int IS NULL OR customer_id = $2)"
        ))
        .bind(order_id)
        .bind(customer_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let items = self.items_for(row.id).await?;
        Ok(Some(row.into_order(items)))
    }

    /// Look up the order created for a checkout session, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE checkout_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let items = self.items_for(row.id).await?;
        Ok(Some(row.into_order(items)))
    }

    /// List a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE customer_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Count a customer's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_customer(&self, customer_id: UserId) -> Result<i64, RepositoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }

    /// List all orders for the admin panel, newest first.
    ///
    /// `search` matches the order number or the customer's email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.order_number, o.customer_id, o.total_amount, o.status,
                    o.shipping_street, o.shipping_city, o.shipping_state,
                    o.shipping_zip_code, o.shipping_country, o.payment_status,
                    o.payment_method, o.notes, o.checkout_session_id,
                    o.created_at, o.updated_at
             FROM orders o
             JOIN users u ON u.id = o.customer_id
             WHERE ($1::text IS NULL OR o.status = $1)
               AND ($2::text IS NULL OR o.order_number ILIKE $2 OR u.email ILIKE $2)
             ORDER BY o.created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Count orders matching the admin listing filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_all(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<i64, RepositoryError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM orders o
             JOIN users u ON u.id = o.customer_id
             WHERE ($1::text IS NULL OR o.status = $1)
               AND ($2::text IS NULL OR o.order_number ILIKE $2 OR u.email ILIKE $2)",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(pattern)
        .fetch_one(self.pool)
        .await?;

        Ok(count.0)
    }

    /// Per-status counts and revenue for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_stats(&self) -> Result<SalesStats, RepositoryError> {
        let row: (i64, Option<Decimal>, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    SUM(total_amount) FILTER
                        (WHERE status IN ('processing', 'shipped', 'delivered')),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'processing'),
                    COUNT(*) FILTER (WHERE status = 'shipped'),
                    COUNT(*) FILTER (WHERE status = 'delivered'),
                    COUNT(*) FILTER (WHERE status = 'cancelled')
             FROM orders",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(SalesStats {
            total_orders: row.0,
            total_revenue: row.1.unwrap_or_default(),
            pending: row.2,
            processing: row.3,
            shipped: row.4,
            delivered: row.5,
            cancelled: row.6,
        })
    }

    /// The most recently placed orders, for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Order count and lifetime spend for one customer. Spend counts the
    /// same statuses as revenue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn customer_stats(&self, customer_id: UserId) -> Result<CustomerStats, RepositoryError> {
        let row: (i64, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*),
                    SUM(total_amount) FILTER
                        (WHERE status IN ('processing', 'shipped', 'delivered'))
             FROM orders WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(self.pool)
        .await?;

        Ok(CustomerStats {
            order_count: row.0,
            total_spent: row.1.unwrap_or_default(),
        })
    }

    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items.into_iter().map(OrderItem::from).collect())
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let items = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}

async fn restock_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    let items: Vec<(ProductId, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM order_items
         WHERE order_id = $1 ORDER BY product_id",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    for (product_id, quantity) in items {
        let current: Option<(i32,)> =
            sqlx::query_as("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?;

        // The product may have been deleted since the order was placed.
        let Some((stock,)) = current else { continue };

        let restocked = stock.saturating_add(quantity);
        // Restocked products come back on sale even if they were hidden
        // while out of stock.
        let status = ProductStatus::Active.derive(restocked);
        sqlx::query(
            "UPDATE products SET stock = $2, status = $3, updated_at = now() WHERE id = $1",
        )
        .bind(product_id)
        .bind(restocked)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Merge duplicate product lines and sort by product id, which is also
/// the row locking order.
///
/// Sorting means lines are checked in id order rather than the order the
/// caller supplied them; when several lines would fail, the first failure
/// reported follows the lock order. The stock outcome is identical either
/// way.
///
/// Merged quantities use checked addition: a sum that would overflow `i32`
/// is rejected instead of wrapping into a negative quantity.
fn merge_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, CreateOrderError> {
    let mut merged: HashMap<ProductId, i32> = HashMap::new();
    for line in lines {
        let quantity = merged.entry(line.product_id).or_insert(0);
        *quantity = quantity
            .checked_add(line.quantity)
            .ok_or(CreateOrderError::QuantityTooLarge(line.product_id))?;
    }
    let mut out: Vec<OrderLine> = merged
        .into_iter()
        .map(|(product_id, quantity)| OrderLine {
            product_id,
            quantity,
        })
        .collect();
    out.sort_by_key(|l| l.product_id);
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_lines_combines_duplicates_and_sorts() {
        let lines = [
            OrderLine {
                product_id: ProductId::from(7),
                quantity: 2,
            },
            OrderLine {
                product_id: ProductId::from(3),
                quantity: 1,
            },
            OrderLine {
                product_id: ProductId::from(7),
                quantity: 3,
            },
        ];
        let merged = merge_lines(&lines).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, ProductId::from(3));
        assert_eq!(merged[0].quantity, 1);
        assert_eq!(merged[1].product_id, ProductId::from(7));
        assert_eq!(merged[1].quantity, 5);
    }

    #[test]
    fn test_merge_lines_empty() {
        assert!(merge_lines(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_merge_lines_rejects_overflowing_quantity() {
        let lines = [
            OrderLine {
                product_id: ProductId::from(1),
                quantity: i32::MAX,
            },
            OrderLine {
                product_id: ProductId::from(1),
                quantity: 2,
            },
        ];
        assert!(matches!(
            merge_lines(&lines),
            Err(CreateOrderError::QuantityTooLarge(id)) if id == ProductId::from(1)
        ));
    }
}
