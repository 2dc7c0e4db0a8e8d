//! Repository trait for click history and analytics.

use crate::domain::entities::{ClickSummary, LinkHistory, NewLinkHistory};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter criteria for history queries.
///
/// Supports date range filtering and pagination.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub offset: i64,
    pub limit: i64,
}

impl HistoryFilter {
    /// Creates a new filter with pagination parameters.
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            from_date: None,
            to_date: None,
            offset,
            limit,
        }
    }

    /// Adds date range filtering to the query.
    pub fn with_date_range(
        mut self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }

    /// Returns true if `at` falls inside the date range.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.from_date.is_none_or(|from| at >= from) && self.to_date.is_none_or(|to| at <= to)
    }
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self::new(0, 25)
    }
}

/// Repository interface for recorded visits.
///
/// Soft-deleted rows are invisible to every read method.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgHistoryRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Appends one visit row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the referenced link does not exist.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn record(&self, entry: NewLinkHistory) -> Result<LinkHistory, AppError>;

    /// Finds a single visit row by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<LinkHistory>, AppError>;

    /// Lists visits of a link, newest first.
    async fn list_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<Vec<LinkHistory>, AppError>;

    /// Aggregates visits of a link. Pagination fields of the filter are ignored.
    async fn summary_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<ClickSummary, AppError>;

    /// Soft-deletes every visit recorded before `cutoff`. Returns the number
    /// of rows affected.
    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
