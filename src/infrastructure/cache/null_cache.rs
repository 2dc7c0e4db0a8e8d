//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, CacheService, CachedTarget};
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is not configured. Every lookup is a miss, so the
/// resolver always reads the store.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_target(&self, _key: &str) -> CacheResult<Option<CachedTarget>> {
        Ok(None)
    }

    async fn set_target(
        &self,
        _key: &str,
        _target: &CachedTarget,
        _ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _keys: &[String]) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
