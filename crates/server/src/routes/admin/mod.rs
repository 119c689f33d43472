//! Admin panel routes. Every handler requires a bearer token with the
//! admin role.

pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(orders::routes())
        .merge(customers::routes())
        .merge(dashboard::routes())
}
