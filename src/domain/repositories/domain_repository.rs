//! Repository trait for domain management.

use crate::domain::entities::{Domain, NewDomain, UpdateDomain};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for managing domains.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgDomainRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Creates a new domain.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a domain with the same name already exists.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_domain: NewDomain) -> Result<Domain, AppError>;

    /// Finds a domain by id, including soft-deleted ones.
    async fn find_by_id(&self, id: i64) -> Result<Option<Domain>, AppError>;

    /// Finds a domain by hostname, including soft-deleted ones.
    ///
    /// Callers decide what a deleted domain means for them.
    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>, AppError>;

    /// Lists live domains, optionally only the available ones.
    async fn list(&self, only_available: bool) -> Result<Vec<Domain>, AppError>;

    /// Updates an existing live domain.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the domain does not exist or is deleted.
    /// Returns [`AppError::Conflict`] if renaming collides with another domain.
    async fn update(&self, id: i64, update: UpdateDomain) -> Result<Domain, AppError>;

    /// Soft-deletes a domain.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the domain does not exist or is already deleted.
    async fn soft_delete(&self, id: i64) -> Result<(), AppError>;

    /// Counts live links bound to a domain.
    async fn count_links(&self, domain_id: i64) -> Result<i64, AppError>;
}
