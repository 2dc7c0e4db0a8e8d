//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET    /{code}`              - Short link redirect (any host)
//! - `GET    /health`              - Health check: store, cache, click queue
//! - `POST   /links`               - Create a link (form)
//! - `PATCH  /links/{id}`          - Update a link
//! - `DELETE /links/{id}`          - Soft-delete a link
//! - `GET    /links/{id}/stats`    - Click summary
//! - `GET    /links/{id}/history`  - Individual visits
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on `/links` only
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{rate_limit, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads the client IP from
///   `X-Forwarded-For` / `X-Real-IP` instead of the peer socket address;
///   enable only behind a trusted reverse proxy
///
/// # Errors
///
/// Returns an error if the rate limiter cannot be configured.
pub fn app_router(state: AppState, behind_proxy: bool) -> anyhow::Result<NormalizePath<Router>> {
    let link_router = api::routes::link_routes().layer(rate_limit::layer(behind_proxy)?);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
        .merge(link_router)
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
