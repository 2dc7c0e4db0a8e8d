//! Link management route definitions.

use axum::{
    Router,
    routing::{get, patch, post},
};

use super::handlers::{
    create_link_handler, delete_link_handler, history_handler, stats_handler, update_link_handler,
};
use crate::state::AppState;

/// Routes that create and manage links.
///
/// Ownership is checked per handler against the `X-User-Id` header.
pub fn link_routes() -> Router<AppState> {
    Router::new()
        .route("/links", post(create_link_handler))
        .route("/links/{id}", patch(update_link_handler).delete(delete_link_handler))
        .route("/links/{id}/stats", get(stats_handler))
        .route("/links/{id}/history", get(history_handler))
}
