//! Business logic services shared across routes.

pub mod auth;
pub mod google;

pub use auth::AuthService;
pub use google::{GoogleClient, OauthStateStore};
