//! Request middleware and extractors.

pub mod auth;
pub mod rate_limit;

pub use auth::{RequireAdmin, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
