//! Cache service trait, keys and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::Link;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key segment standing for the primary service host.
const DEFAULT_HOST_SEGMENT: &str = "_";

/// Cached resolution of a reachable link.
///
/// Only reachable links are ever cached, so a hit can redirect without
/// touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTarget {
    pub link_id: i64,
    pub destination: String,
}

/// Builds the cache key for a code resolved under a host.
///
/// `None` is the primary host. Domain names are expected already
/// normalized (lowercase, no port).
pub fn cache_key(domain: Option<&str>, code: &str) -> String {
    format!("{}/{}", domain.unwrap_or(DEFAULT_HOST_SEGMENT), code)
}

/// Every key under which `link` may have been cached.
///
/// A domain-bound link also resolves on the primary host, so it can sit
/// under two keys.
pub fn keys_for_link(link: &Link) -> Vec<String> {
    let mut keys = vec![cache_key(None, &link.short_name)];
    if let Some(domain) = link.domain_name() {
        keys.push(cache_key(Some(domain), &link.short_name));
    }
    keys
}

/// Read-through cache in front of the resolver.
///
/// Implementations must be thread-safe and handle errors gracefully without
/// disrupting the application (cache failures degrade to store lookups).
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process map, for single-node runs
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves a cached target.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(target))` on cache hit
    /// - `Ok(None)` on cache miss or error (fail-open behavior)
    async fn get_target(&self, key: &str) -> CacheResult<Option<CachedTarget>>;

    /// Stores a target with an optional TTL in seconds (implementation
    /// default if `None`).
    async fn set_target(
        &self,
        key: &str,
        target: &CachedTarget,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()>;

    /// Removes cached entries.
    ///
    /// Used when a link or its domain changes state.
    async fn invalidate(&self, keys: &[String]) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Whether stored targets can ever be read back.
    ///
    /// `false` lets callers skip work that only matters for a real cache.
    fn is_enabled(&self) -> bool {
        true
    }
}
