//! Domain management service.

use crate::domain::entities::{Domain, NewDomain, OrphanPolicy, UpdateDomain};
use crate::domain::repositories::{DomainRepository, LinkRepository};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, cache_key};
use crate::utils::host::normalize_host;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Service for managing the hostnames that serve short links.
///
/// Handles domain CRUD operations with validation to ensure:
/// - Valid DNS-compatible domain names
/// - Cached redirects follow availability changes immediately
/// - Deletion never silently strands bound links
pub struct DomainService<D, L>
where
    D: DomainRepository + ?Sized,
    L: LinkRepository + ?Sized,
{
    repository: Arc<D>,
    link_repository: Arc<L>,
    cache: Arc<dyn CacheService>,
}

impl<D, L> DomainService<D, L>
where
    D: DomainRepository + ?Sized,
    L: LinkRepository + ?Sized,
{
    /// Creates a new domain service.
    pub fn new(repository: Arc<D>, link_repository: Arc<L>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            repository,
            link_repository,
            cache,
        }
    }

    /// Registers a new domain. The name is stored lowercased.
    ///
    /// # Validation
    ///
    /// - Must contain at least one dot
    /// - Length: 1-255 characters
    /// - Allowed characters: alphanumeric, dots, hyphens
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if validation fails.
    /// Returns [`AppError::Conflict`] if the domain already exists, deleted
    /// ones included.
    pub async fn create_domain(&self, name: &str) -> Result<Domain, AppError> {
        let name = normalize_host(name);
        validate_domain_name(&name)?;

        if self.repository.find_by_name(&name).await?.is_some() {
            return Err(AppError::conflict(
                "Domain already exists",
                json!({ "domain": name }),
            ));
        }

        let domain = self.repository.create(NewDomain { name }).await?;
        info!("Registered domain {} ({})", domain.name, domain.id);
        Ok(domain)
    }

    /// Retrieves a domain by id, deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the domain does not exist.
    pub async fn get_domain(&self, id: i64) -> Result<Domain, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Domain not found", json!({ "id": id })))
    }

    /// Looks up a domain new links may be bound to.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the domain is unknown, disabled or deleted.
    pub async fn serving_domain(&self, name: &str) -> Result<Domain, AppError> {
        let name = normalize_host(name);

        match self.repository.find_by_name(&name).await? {
            Some(domain) if domain.is_serving() => Ok(domain),
            _ => Err(AppError::bad_request(
                "Domain is not available",
                json!({ "domain": name }),
            )),
        }
    }

    /// Lists live domains, optionally only the available ones.
    pub async fn list_domains(&self, only_available: bool) -> Result<Vec<Domain>, AppError> {
        self.repository.list(only_available).await
    }

    /// Enables or disables a domain.
    ///
    /// Disabling makes every link bound to it unreachable at once; cached
    /// redirects for those links are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the domain does not exist or is deleted.
    pub async fn set_available(&self, id: i64, available: bool) -> Result<Domain, AppError> {
        let domain = self
            .repository
            .update(
                id,
                UpdateDomain {
                    available: Some(available),
                    ..UpdateDomain::default()
                },
            )
            .await?;

        let keys = self.bound_link_keys(&domain).await?;
        self.invalidate(&domain, &keys).await;
        info!(
            "Domain {} is now {}",
            domain.name,
            if available { "enabled" } else { "disabled" }
        );
        Ok(domain)
    }

    /// Soft-deletes a domain, handling its links as `policy` says.
    ///
    /// Returns the number of links the policy changed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the domain does not exist or is
    /// already deleted.
    pub async fn delete_domain(&self, id: i64, policy: OrphanPolicy) -> Result<u64, AppError> {
        let domain = self.get_domain(id).await?;
        if domain.is_deleted() {
            return Err(AppError::not_found("Domain not found", json!({ "id": id })));
        }

        // Collected before the policy runs: detached links no longer list
        // under this domain. Invalidation happens after every write lands.
        let keys = self.bound_link_keys(&domain).await?;

        let affected = match policy {
            OrphanPolicy::Retain => 0,
            OrphanPolicy::Reassign => self.link_repository.detach_domain(id).await?,
            OrphanPolicy::Disable => self.link_repository.disable_by_domain(id).await?,
        };

        self.repository.soft_delete(id).await?;
        self.invalidate(&domain, &keys).await;

        info!(
            "Deleted domain {} ({:?}, {} link(s) affected)",
            domain.name, policy, affected
        );
        Ok(affected)
    }

    /// Number of live links bound to a domain.
    pub async fn count_links(&self, id: i64) -> Result<i64, AppError> {
        self.repository.count_links(id).await
    }

    /// Cache keys of every link bound to `domain`, under both hosts.
    async fn bound_link_keys(&self, domain: &Domain) -> Result<Vec<String>, AppError> {
        let codes = self.link_repository.codes_for_domain(domain.id).await?;

        Ok(codes
            .iter()
            .flat_map(|code| [cache_key(None, code), cache_key(Some(&domain.name), code)])
            .collect())
    }

    async fn invalidate(&self, domain: &Domain, keys: &[String]) {
        if keys.is_empty() {
            return;
        }

        if let Err(e) = self.cache.invalidate(keys).await {
            warn!("Failed to invalidate cache for domain {}: {}", domain.name, e);
        }
    }
}

/// Validates domain name format.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if validation fails.
fn validate_domain_name(domain: &str) -> Result<(), AppError> {
    if domain.is_empty() || domain.len() > 255 {
        return Err(AppError::bad_request(
            "Invalid domain name length",
            json!({ "min": 1, "max": 255 }),
        ));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(AppError::bad_request(
            "Invalid domain format",
            json!({ "hint": "Domain must contain at least one inner dot" }),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(AppError::bad_request(
            "Invalid characters in domain name",
            json!({ "allowed": "a-z, 0-9, dots, hyphens" }),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{MockDomainRepository, MockLinkRepository};
    use crate::infrastructure::cache::{CachedTarget, MemoryCache, MockCacheService, NullCache};
    use chrono::Utc;
    use mockall::Sequence;

    fn create_test_domain(id: i64, name: &str, available: bool) -> Domain {
        let now = Utc::now();
        Domain {
            id,
            name: name.to_string(),
            available,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(
        domains: MockDomainRepository,
        links: MockLinkRepository,
    ) -> DomainService<MockDomainRepository, MockLinkRepository> {
        DomainService::new(Arc::new(domains), Arc::new(links), Arc::new(NullCache::new()))
    }

    #[tokio::test]
    async fn test_create_domain_success() {
        let mut mock_repo = MockDomainRepository::new();
        mock_repo
            .expect_find_by_name()
            .withf(|name| name == "new.example.com")
            .times(1)
            .returning(|_| Ok(None));
        mock_repo
            .expect_create()
            .withf(|d| d.name == "new.example.com")
            .times(1)
            .returning(|d| Ok(create_test_domain(1, &d.name, true)));

        let domain = service(mock_repo, MockLinkRepository::new())
            .create_domain("New.Example.com")
            .await
            .unwrap();

        assert_eq!(domain.name, "new.example.com");
        assert!(domain.available);
    }

    #[tokio::test]
    async fn test_create_domain_already_exists() {
        let mut mock_repo = MockDomainRepository::new();
        mock_repo
            .expect_find_by_name()
            .times(1)
            .returning(|name| Ok(Some(create_test_domain(1, name, true))));
        mock_repo.expect_create().times(0);

        let result = service(mock_repo, MockLinkRepository::new())
            .create_domain("existing.com")
            .await;

        assert!(matches!(result.unwrap_err(), AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_domain_invalid_names() {
        let svc = service(MockDomainRepository::new(), MockLinkRepository::new());

        for bad in ["", "localhost", "bad_domain!.com", ".example.com", "example.com."] {
            let result = svc.create_domain(bad).await;
            assert!(
                matches!(result, Err(AppError::Validation { .. })),
                "'{bad}' should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_serving_domain_rejects_disabled() {
        let mut mock_repo = MockDomainRepository::new();
        mock_repo
            .expect_find_by_name()
            .returning(|name| Ok(Some(create_test_domain(1, name, false))));

        let result = service(mock_repo, MockLinkRepository::new())
            .serving_domain("go.example.com")
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_set_available_invalidates_bound_links() {
        let mut domains = MockDomainRepository::new();
        domains
            .expect_update()
            .withf(|id, u| *id == 2 && u.available == Some(false) && u.name.is_none())
            .returning(|id, _| Ok(create_test_domain(id, "go.example.com", false)));
        let mut links = MockLinkRepository::new();
        links
            .expect_codes_for_domain()
            .returning(|_| Ok(vec!["abc".to_string()]));

        let cache = Arc::new(MemoryCache::new(60));
        let target = CachedTarget {
            link_id: 1,
            destination: "https://example.com".to_string(),
        };
        cache.set_target("_/abc", &target, None).await.unwrap();
        cache.set_target("go.example.com/abc", &target, None).await.unwrap();
        cache.set_target("_/other", &target, None).await.unwrap();

        let svc = DomainService::new(Arc::new(domains), Arc::new(links), cache.clone());
        let domain = svc.set_available(2, false).await.unwrap();

        assert!(!domain.available);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_domain_reassign_detaches_links() {
        let mut domains = MockDomainRepository::new();
        domains
            .expect_find_by_id()
            .returning(|id| Ok(Some(create_test_domain(id, "go.example.com", true))));
        domains.expect_soft_delete().times(1).returning(|_| Ok(()));
        let mut links = MockLinkRepository::new();
        links.expect_codes_for_domain().returning(|_| Ok(vec![]));
        links.expect_detach_domain().times(1).returning(|_| Ok(4));
        links.expect_disable_by_domain().times(0);

        let affected = service(domains, links)
            .delete_domain(2, OrphanPolicy::Reassign)
            .await
            .unwrap();

        assert_eq!(affected, 4);
    }

    #[tokio::test]
    async fn test_delete_domain_disable_marks_links() {
        let mut domains = MockDomainRepository::new();
        domains
            .expect_find_by_id()
            .returning(|id| Ok(Some(create_test_domain(id, "go.example.com", true))));
        domains.expect_soft_delete().times(1).returning(|_| Ok(()));
        let mut links = MockLinkRepository::new();
        links.expect_codes_for_domain().returning(|_| Ok(vec![]));
        links.expect_detach_domain().times(0);
        links.expect_disable_by_domain().times(1).returning(|_| Ok(2));

        let affected = service(domains, links)
            .delete_domain(2, OrphanPolicy::Disable)
            .await
            .unwrap();

        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_delete_domain_retain_leaves_links() {
        let mut domains = MockDomainRepository::new();
        domains
            .expect_find_by_id()
            .returning(|id| Ok(Some(create_test_domain(id, "go.example.com", true))));
        domains.expect_soft_delete().times(1).returning(|_| Ok(()));
        let mut links = MockLinkRepository::new();
        links.expect_codes_for_domain().returning(|_| Ok(vec![]));
        links.expect_detach_domain().times(0);
        links.expect_disable_by_domain().times(0);

        let affected = service(domains, links)
            .delete_domain(2, OrphanPolicy::Retain)
            .await
            .unwrap();

        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_delete_domain_invalidates_after_policy_and_delete() {
        let mut seq = Sequence::new();
        let mut domains = MockDomainRepository::new();
        let mut links = MockLinkRepository::new();
        let mut cache = MockCacheService::new();

        domains
            .expect_find_by_id()
            .returning(|id| Ok(Some(create_test_domain(id, "go.example.com", true))));
        links
            .expect_codes_for_domain()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec!["abc".to_string()]));
        links
            .expect_detach_domain()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        domains
            .expect_soft_delete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        cache
            .expect_invalidate()
            .withf(|keys| keys.len() == 2 && keys[0] == "_/abc" && keys[1] == "go.example.com/abc")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let svc = DomainService::new(Arc::new(domains), Arc::new(links), Arc::new(cache));
        let affected = svc.delete_domain(2, OrphanPolicy::Reassign).await.unwrap();

        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_delete_domain_skips_invalidation_without_links() {
        let mut domains = MockDomainRepository::new();
        domains
            .expect_find_by_id()
            .returning(|id| Ok(Some(create_test_domain(id, "go.example.com", true))));
        domains.expect_soft_delete().times(1).returning(|_| Ok(()));
        let mut links = MockLinkRepository::new();
        links.expect_codes_for_domain().returning(|_| Ok(vec![]));
        let mut cache = MockCacheService::new();
        cache.expect_invalidate().times(0);

        let svc = DomainService::new(Arc::new(domains), Arc::new(links), Arc::new(cache));
        svc.delete_domain(2, OrphanPolicy::Retain).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_domain() {
        let mut domains = MockDomainRepository::new();
        domains.expect_find_by_id().returning(|_| Ok(None));

        let result = service(domains, MockLinkRepository::new())
            .delete_domain(9, OrphanPolicy::Retain)
            .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
