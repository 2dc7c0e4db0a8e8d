use super::GeoLocator;
use async_trait::async_trait;

/// Geolocation disabled: every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLocator;

#[async_trait]
impl GeoLocator for NullLocator {
    async fn lookup_country(&self, _ip: &str) -> Option<String> {
        None
    }
}
