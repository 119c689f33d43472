//! Database operations for the Pomelo `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts (password and/or Google identity, role, profile)
//! - `addresses` - Address books
//! - `cart_items` - Per-user carts (one row per product)
//! - `products` - Catalog
//! - `orders` / `order_items` - Immutable order records with snapshots
//!
//! Queries use the runtime sqlx API (`query`/`query_as` with binds) so the
//! workspace builds without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p pomelo-cli -- migrate
//! ```

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use orders::{CancelOrderError, CreateOrderError, OrderRepository};
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or SKU).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The transaction lost a serialization/deadlock race and can be retried.
    #[error("transaction conflict, retry")]
    Serialization,
}

impl RepositoryError {
    /// Map a sqlx error, folding unique violations into `Conflict` and
    /// serialization/deadlock failures into `Serialization`.
    ///
    /// Postgres class 40 (40001 serialization failure, 40P01 deadlock)
    /// means the transaction may be retried by the caller.
    pub fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict_message.to_owned());
            }
            if matches!(db_err.code().as_deref(), Some("40001" | "40P01")) {
                return Self::Serialization;
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
