//! REST routes, mounted under `/api`.

pub mod carts;
pub mod products;

use axum::Router;

use crate::AppState;

pub fn api() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/carts", carts::router())
}
