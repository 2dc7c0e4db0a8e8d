//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the link half of the link store.
///
/// Uniqueness of `short_name` is enforced by the storage itself
/// (insert-or-fail), never by application-level locking, so concurrent
/// inserts of the same name resolve to exactly one winner.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DuplicateCode`] if the short name is already issued.
    /// Returns [`AppError::Validation`] if the referenced domain does not exist.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by id, including soft-deleted links.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Finds a live link by its exact short name.
    ///
    /// When `domain_id` is given the link must be bound to that domain.
    /// Soft-deleted links are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_code(
        &self,
        code: &str,
        domain_id: Option<i64>,
    ) -> Result<Option<Link>, AppError>;

    /// Partially updates a live link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link is absent or soft-deleted.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError>;

    /// Soft-deletes a link by setting `deleted_at = now()`.
    ///
    /// Returns `Ok(true)` if the link was found and deleted, `Ok(false)` if not
    /// found or already deleted.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Physically removes a soft-deleted link.
    ///
    /// History rows referencing it survive with their `link_id` cleared.
    /// Returns `Ok(false)` if the link does not exist or is still live.
    async fn purge(&self, id: i64) -> Result<bool, AppError>;

    /// Short names of every link bound to a domain, deleted ones included.
    async fn codes_for_domain(&self, domain_id: i64) -> Result<Vec<String>, AppError>;

    /// Moves every link of a domain to the default host. Returns the number
    /// of links moved.
    async fn detach_domain(&self, domain_id: i64) -> Result<u64, AppError>;

    /// Marks every link of a domain unavailable. Returns the number of
    /// links changed.
    async fn disable_by_domain(&self, domain_id: i64) -> Result<u64, AppError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}
