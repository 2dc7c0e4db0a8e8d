//! Per-client rate limiting for the link management routes.

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor};

use crate::utils::client_ip::client_ip;

/// Keys requests by the same client IP the click recorder sees.
///
/// Forwarding headers are only trusted when `behind_proxy` is set; otherwise
/// the socket peer address is used.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    behind_proxy: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(behind_proxy: bool) -> Self {
        Self { behind_proxy }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        client_ip(req.headers(), peer, self.behind_proxy).ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RateLimitLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Creates the rate limiter for link management endpoints.
///
/// # Limits
///
/// - **Rate**: 1 request per second
/// - **Burst**: 20 requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`. The
/// redirect path is never limited.
///
/// # Example
///
/// ```rust,ignore
/// let links = api::routes::link_routes().layer(rate_limit::layer(behind_proxy)?);
/// ```
///
/// # Errors
///
/// Returns an error if the quota cannot be built.
pub fn layer(behind_proxy: bool) -> anyhow::Result<RateLimitLayer> {
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(behind_proxy))
        .per_second(1)
        .burst_size(20)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit quota"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ConnectInfo;

    fn request(xff: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/links");
        if let Some(xff) = xff {
            builder = builder.header("x-forwarded-for", xff);
        }
        let mut req = builder.body(()).unwrap();
        let peer: SocketAddr = "10.0.0.5:41000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        req
    }

    #[test]
    fn test_peer_key_without_proxy() {
        let key = ClientIpKeyExtractor::new(false)
            .extract(&request(Some("203.0.113.7")))
            .unwrap();
        assert_eq!(key, "10.0.0.5");
    }

    #[test]
    fn test_forwarded_key_behind_proxy() {
        let key = ClientIpKeyExtractor::new(true)
            .extract(&request(Some("203.0.113.7, 10.0.0.1")))
            .unwrap();
        assert_eq!(key, "203.0.113.7");
    }

    #[test]
    fn test_missing_peer_is_rejected() {
        let req = Request::builder().uri("/links").body(()).unwrap();
        assert!(ClientIpKeyExtractor::new(false).extract(&req).is_err());
    }

    #[test]
    fn test_layer_builds() {
        assert!(layer(false).is_ok());
    }
}
