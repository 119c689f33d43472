//! Shared domain types for Pomelo.
//!
//! This crate holds the types that both the server and the CLI depend on:
//! newtype entity IDs, the validated [`Email`] type, the closed category and
//! status enums (including the order state machine), and order-number
//! generation.
//!
//! Enable the `postgres` feature for sqlx `Type`/`Encode`/`Decode` impls.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod order_number;
pub mod types;

pub use order_number::OrderNumber;
pub use types::*;
