//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::application::services::RedirectResult;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}` on any host
///
/// # Request Flow
///
/// 1. Map the `Host` header to a domain context (primary hosts are the default)
/// 2. Resolve the code through the read-through cache
/// 3. Queue the visit for the background recorder (never waited on)
/// 4. Return `302 Found` with `Location`
///
/// # Errors
///
/// Returns 404 Not Found with the same body whether the code is unknown or
/// the link (or its domain) is disabled or deleted.
/// Returns 500 only if the store cannot be read.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<RedirectResult, AppError> {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok());
    let ip = client_ip(&headers, Some(addr), state.behind_proxy);

    state
        .redirect_service
        .handle(host, &code, ip, user_agent)
        .await
}

impl IntoResponse for RedirectResult {
    fn into_response(self) -> Response {
        match self {
            RedirectResult::Redirect { location, status } => {
                (status, [(header::LOCATION, location)]).into_response()
            }
            RedirectResult::NotFound => {
                AppError::not_found("Short link not found", json!({})).into_response()
            }
        }
    }
}
