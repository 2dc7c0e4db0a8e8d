//! IP geolocation collaborators used by the click recorder.
//!
//! - [`IpApiLocator`] - ip-api.com lookups with a per-IP memo
//! - [`NullLocator`] - Never resolves, for offline deployments and tests

mod ip_api;
mod null_locator;

use async_trait::async_trait;

pub use ip_api::{IpApiLocator, is_private};
pub use null_locator::NullLocator;

/// Country label recorded when no lookup result is available.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Resolves a visitor IP to a country name.
///
/// Implementations never fail: anything that cannot be resolved is `None`
/// and the caller records [`UNKNOWN_COUNTRY`]. Latency bounds are applied by
/// the caller.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn lookup_country(&self, ip: &str) -> Option<String>;
}
