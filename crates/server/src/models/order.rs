//! Order and line-item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pomelo_core::{OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId};

/// An immutable record of a completed purchase intent.
///
/// Line items are point-in-time snapshots: later catalog edits must never
/// alter a historical order. `total_amount` equals the sum of
/// `price * quantity` over the items at creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Stripe checkout session that paid for this order, when it came
    /// through the webhook path. Unique: the webhook idempotency key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A snapshotted line item.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub name: String,
    pub quantity: i32,
    /// Unit price at purchase time.
    pub price: Decimal,
    /// Primary product image at purchase time.
    pub image: String,
}

/// Shipping destination embedded in an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_address_camel_case_wire_format() {
        let address = ShippingAddress {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            country: "US".into(),
        };
        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json["zipCode"], "62701");
    }
}
