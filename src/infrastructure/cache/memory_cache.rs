//! In-process cache backed by a concurrent map.

use super::service::{CacheResult, CacheService, CachedTarget};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Process-local cache with per-entry expiry.
///
/// Suitable for a single instance; with several instances behind a load
/// balancer invalidations would not propagate, use [`super::RedisCache`].
///
/// Expired entries are dropped on read, by [`MemoryCache::purge_expired`]
/// and whenever an insert finds the cache full. Once full of live entries,
/// new targets are simply not cached until something expires.
pub struct MemoryCache {
    entries: DashMap<String, (CachedTarget, Instant)>,
    default_ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(default_ttl_seconds: u64) -> Self {
        Self::with_capacity(default_ttl_seconds, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(default_ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            max_entries: max_entries.max(1),
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        let purged = before.saturating_sub(self.entries.len());

        if purged > 0 {
            debug!("Cache PURGE: {} expired entries", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_target(&self, key: &str) -> CacheResult<Option<CachedTarget>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.0.clone(), entry.1 > now));

        match hit {
            Some((target, true)) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(target))
            }
            Some((_, false)) => {
                self.entries.remove(key);
                debug!("Cache EXPIRED: {}", key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_target(
        &self,
        key: &str,
        target: &CachedTarget,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.purge_expired();

            if self.entries.len() >= self.max_entries {
                debug!("Cache FULL: not storing {}", key);
                return Ok(());
            }
        }

        let ttl = ttl_seconds.map_or(self.default_ttl, Duration::from_secs);
        self.entries
            .insert(key.to_string(), (target.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn invalidate(&self, keys: &[String]) -> CacheResult<()> {
        for key in keys {
            if self.entries.remove(key).is_some() {
                debug!("Cache INVALIDATE: {}", key);
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: i64) -> CachedTarget {
        CachedTarget {
            link_id: id,
            destination: format!("https://example.com/{id}"),
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new(60);
        cache.set_target("_/abc", &target(1), None).await.unwrap();

        assert_eq!(cache.get_target("_/abc").await.unwrap(), Some(target(1)));
        assert_eq!(cache.get_target("_/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let cache = MemoryCache::new(60);
        cache.set_target("_/abc", &target(1), Some(0)).await.unwrap();

        assert_eq!(cache.get_target("_/abc").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_removes_all_given_keys() {
        let cache = MemoryCache::new(60);
        cache.set_target("_/abc", &target(1), None).await.unwrap();
        cache.set_target("go.example.com/abc", &target(1), None).await.unwrap();
        cache.set_target("_/other", &target(2), None).await.unwrap();

        cache
            .invalidate(&["_/abc".to_string(), "go.example.com/abc".to_string()])
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.get_target("_/other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_entries() {
        let cache = MemoryCache::new(60);
        cache.set_target("_/old", &target(1), Some(0)).await.unwrap();
        cache.set_target("_/live", &target(2), None).await.unwrap();

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_target("_/live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_cache_reclaims_expired_entries() {
        let cache = MemoryCache::with_capacity(60, 2);
        cache.set_target("_/a", &target(1), Some(0)).await.unwrap();
        cache.set_target("_/b", &target(2), None).await.unwrap();

        cache.set_target("_/c", &target(3), None).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get_target("_/c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_cache_skips_new_keys() {
        let cache = MemoryCache::with_capacity(60, 2);
        cache.set_target("_/a", &target(1), None).await.unwrap();
        cache.set_target("_/b", &target(2), None).await.unwrap();

        cache.set_target("_/c", &target(3), None).await.unwrap();
        cache.set_target("_/a", &target(4), None).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_target("_/c").await.unwrap(), None);
        assert_eq!(cache.get_target("_/a").await.unwrap(), Some(target(4)));
    }
}
