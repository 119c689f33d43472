//! Account, address, and cart models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use pomelo_core::{AddressId, Email, ProductId, Role, UserId};

/// A user account.
///
/// Invariant: at least one of `password_hash` / `google_id` is present — an
/// account is reachable either by password login or by Google OAuth.
/// `password_hash` never leaves the server; it is skipped during
/// serialization.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub picture: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved address in a user's address book.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub is_default: bool,
}

/// A cart entry joined with live product data.
///
/// Prices here reflect the catalog *now*, not a locked-in quote; the
/// snapshot happens at order creation.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    pub quantity: i32,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
}

impl CartEntry {
    /// Line total at current catalog prices.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
