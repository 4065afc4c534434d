//! HTTP surface: a single catch-all webhook endpoint.

pub mod webhook;

use axum::Router;

use crate::SharedState;

pub use webhook::handle_request;

/// Every path and method lands in [`handle_request`].
pub fn build_router(state: SharedState) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}
