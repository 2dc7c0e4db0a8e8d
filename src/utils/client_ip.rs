//! Client address resolution.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Parses a forwarding header value as a bare IP address.
fn header_ip(headers: &HeaderMap, name: &str, first_of_list: bool) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    let candidate = if first_of_list {
        value.split(',').next()?
    } else {
        value
    };
    candidate.trim().parse().ok()
}

/// Determines the visitor IP for click recording.
///
/// Behind a reverse proxy the peer address is the proxy itself, so the
/// first `X-Forwarded-For` entry wins, then `X-Real-IP`. A header value that
/// is not a plain IP address is skipped. Forwarding headers are ignored
/// unless `behind_proxy` is set, since any client can forge them.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> Option<String> {
    if behind_proxy
        && let Some(ip) = header_ip(headers, "x-forwarded-for", true)
            .or_else(|| header_ip(headers, "x-real-ip", false))
    {
        return Some(ip.to_string());
    }

    peer.map(|addr| addr.ip().to_string())
}
