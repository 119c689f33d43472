//! Domain models persisted by the repositories.

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderItem, ShippingAddress};
pub use product::Product;
pub use user::{Address, CartEntry, User};
