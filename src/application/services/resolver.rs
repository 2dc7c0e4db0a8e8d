//! Short code resolution.

use std::sync::Arc;

use crate::domain::repositories::{DomainRepository, LinkRepository};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedTarget, cache_key};
use tracing::{debug, warn};

/// Host a code is being resolved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainContext {
    /// One of the primary service hosts. Every live link resolves here.
    Default,
    /// A custom domain, already normalized (lowercase, no port).
    Host(String),
}

impl DomainContext {
    fn name(&self) -> Option<&str> {
        match self {
            DomainContext::Default => None,
            DomainContext::Host(name) => Some(name),
        }
    }
}

/// A reachable link, reduced to what a redirect needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub link_id: i64,
    pub destination: String,
}

/// Why a code did not resolve. Kept apart for logs and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No live link with that code under that host.
    NotFound,
    /// The link exists but it or its domain is disabled or deleted.
    Unavailable,
}

impl MissReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MissReason::NotFound => "not_found",
            MissReason::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Destination(ResolvedLink),
    Miss(MissReason),
}

/// Read-only mapping from `(host, code)` to a destination.
///
/// Sits behind the read-through cache. Only reachable targets are cached,
/// and cache failures fall back to the store. Every cache fill is followed
/// by a second store read; if the link changed in between, the fresh entry
/// is dropped again, so a concurrent update or delete cannot leave a stale
/// target behind for the rest of the TTL.
pub struct Resolver<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    link_repository: Arc<L>,
    domain_repository: Arc<D>,
    cache: Arc<dyn CacheService>,
    cache_ttl_seconds: Option<u64>,
}

impl<L, D> Resolver<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    pub fn new(link_repository: Arc<L>, domain_repository: Arc<D>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            link_repository,
            domain_repository,
            cache,
            cache_ttl_seconds: None,
        }
    }

    /// Overrides the cache backend's default TTL for resolved targets.
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = Some(seconds);
        self
    }

    /// Resolves `code` under `context`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store cannot be read. Misses are
    /// not errors.
    pub async fn resolve(&self, code: &str, context: &DomainContext) -> Result<Resolution, AppError> {
        let key = cache_key(context.name(), code);

        match self.cache.get_target(&key).await {
            Ok(Some(target)) => {
                return Ok(Resolution::Destination(ResolvedLink {
                    link_id: target.link_id,
                    destination: target.destination,
                }));
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let domain_id = match context {
            DomainContext::Default => None,
            DomainContext::Host(name) => match self.domain_repository.find_by_name(name).await? {
                Some(domain) => Some(domain.id),
                None => {
                    debug!("Unknown host '{}'", name);
                    return Ok(Resolution::Miss(MissReason::NotFound));
                }
            },
        };

        let Some(link) = self.link_repository.find_by_code(code, domain_id).await? else {
            return Ok(Resolution::Miss(MissReason::NotFound));
        };

        if !link.is_reachable() {
            return Ok(Resolution::Miss(MissReason::Unavailable));
        }

        let target = CachedTarget {
            link_id: link.id,
            destination: link.destination,
        };
        if self.cache.is_enabled() {
            self.fill_cache(&key, code, domain_id, &target).await;
        }

        Ok(Resolution::Destination(ResolvedLink {
            link_id: target.link_id,
            destination: target.destination,
        }))
    }

    /// Stores `target`, then re-reads the link and drops the entry if it no
    /// longer matches. Writers invalidate after they commit, so either their
    /// invalidation or this re-read observes the change.
    async fn fill_cache(&self, key: &str, code: &str, domain_id: Option<i64>, target: &CachedTarget) {
        if let Err(e) = self
            .cache
            .set_target(key, target, self.cache_ttl_seconds)
            .await
        {
            warn!("Cache write failed for {}: {}", key, e);
            return;
        }

        let still_current = match self.link_repository.find_by_code(code, domain_id).await {
            Ok(Some(link)) => {
                link.is_reachable()
                    && link.id == target.link_id
                    && link.destination == target.destination
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Cache fill re-check failed for {}: {}", key, e);
                false
            }
        };

        if !still_current {
            debug!("Link behind {} changed during resolution, dropping cache entry", key);
            if let Err(e) = self.cache.invalidate(&[key.to_owned()]).await {
                warn!("Cache invalidation failed for {}: {}", key, e);
            }
        }
    }
}
