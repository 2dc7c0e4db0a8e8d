//! Click statistics read side and retention.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::domain::entities::{ClickSummary, LinkHistory};
use crate::domain::repositories::{HistoryFilter, HistoryRepository, LinkRepository};
use crate::error::AppError;

/// Largest page a history listing returns.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Service for reading recorded visits.
///
/// Statistics stay readable for soft-deleted links; only unknown link ids
/// are rejected.
pub struct StatsService<H, L>
where
    H: HistoryRepository + ?Sized,
    L: LinkRepository + ?Sized,
{
    repository: Arc<H>,
    link_repository: Arc<L>,
}

impl<H, L> StatsService<H, L>
where
    H: HistoryRepository + ?Sized,
    L: LinkRepository + ?Sized,
{
    /// Creates a new statistics service.
    pub fn new(repository: Arc<H>, link_repository: Arc<L>) -> Self {
        Self {
            repository,
            link_repository,
        }
    }

    /// Aggregated numbers for one link: totals, distinct IPs and per
    /// browser / OS / country counts.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the date range is inverted.
    /// Returns [`AppError::NotFound`] if the link does not exist.
    pub async fn summary(&self, link_id: i64, filter: HistoryFilter) -> Result<ClickSummary, AppError> {
        validate_range(&filter)?;
        self.ensure_link(link_id).await?;
        self.repository.summary_for_link(link_id, filter).await
    }

    /// Individual visits of one link, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if pagination is out of range
    /// (`limit` 1-100, `offset` >= 0) or the date range is inverted.
    /// Returns [`AppError::NotFound`] if the link does not exist.
    pub async fn history(&self, link_id: i64, filter: HistoryFilter) -> Result<Vec<LinkHistory>, AppError> {
        if !(1..=MAX_PAGE_SIZE).contains(&filter.limit) || filter.offset < 0 {
            return Err(AppError::bad_request(
                "Invalid pagination",
                json!({ "limit": filter.limit, "offset": filter.offset, "max_limit": MAX_PAGE_SIZE }),
            ));
        }
        validate_range(&filter)?;
        self.ensure_link(link_id).await?;
        self.repository.list_for_link(link_id, filter).await
    }

    /// Soft-deletes visits older than `retention_days`. Returns the number
    /// of rows hidden.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `retention_days` is below 1.
    pub async fn prune(&self, retention_days: i64) -> Result<u64, AppError> {
        if retention_days < 1 {
            return Err(AppError::bad_request(
                "Retention must be at least one day",
                json!({ "days": retention_days }),
            ));
        }

        let cutoff = Utc::now() - Duration::days(retention_days);
        let pruned = self.repository.soft_delete_before(cutoff).await?;

        info!("Pruned {} visit(s) recorded before {}", pruned, cutoff);
        Ok(pruned)
    }

    async fn ensure_link(&self, link_id: i64) -> Result<(), AppError> {
        match self.link_repository.find_by_id(link_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("Link not found", json!({ "id": link_id }))),
        }
    }
}

fn validate_range(filter: &HistoryFilter) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (filter.from_date, filter.to_date)
        && from > to
    {
        return Err(AppError::bad_request(
            "'from' must not be after 'to'",
            json!({ "from": from, "to": to }),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Bucket;
    use crate::domain::entities::link::fixtures::link;
    use crate::domain::repositories::{MockHistoryRepository, MockLinkRepository};

    fn existing_link() -> MockLinkRepository {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_id()
            .returning(|id| Ok(Some(link(id, "abc1234", "https://example.com"))));
        links
    }

    #[tokio::test]
    async fn test_summary_success() {
        let mut history = MockHistoryRepository::new();
        history
            .expect_summary_for_link()
            .withf(|id, _| *id == 1)
            .times(1)
            .returning(|_, _| {
                Ok(ClickSummary {
                    total: 5,
                    unique_visitors: 3,
                    browsers: vec![Bucket {
                        label: "Chrome".to_string(),
                        count: 5,
                    }],
                    ..ClickSummary::default()
                })
            });

        let service = StatsService::new(Arc::new(history), Arc::new(existing_link()));
        let summary = service.summary(1, HistoryFilter::default()).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.unique_visitors, 3);
        assert_eq!(summary.browsers[0].label, "Chrome");
    }

    #[tokio::test]
    async fn test_summary_unknown_link() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_id().returning(|_| Ok(None));
        let mut history = MockHistoryRepository::new();
        history.expect_summary_for_link().times(0);

        let service = StatsService::new(Arc::new(history), Arc::new(links));
        let result = service.summary(99, HistoryFilter::default()).await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let service = StatsService::new(
            Arc::new(MockHistoryRepository::new()),
            Arc::new(MockLinkRepository::new()),
        );
        let now = Utc::now();
        let filter = HistoryFilter::default().with_date_range(Some(now), Some(now - Duration::days(1)));

        let result = service.summary(1, filter).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_history_pagination_bounds() {
        let service = StatsService::new(
            Arc::new(MockHistoryRepository::new()),
            Arc::new(existing_link()),
        );

        for (offset, limit) in [(0, 0), (0, 101), (-1, 10)] {
            let result = service.history(1, HistoryFilter::new(offset, limit)).await;
            assert!(matches!(result, Err(AppError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_prune_computes_cutoff() {
        let mut history = MockHistoryRepository::new();
        history
            .expect_soft_delete_before()
            .withf(|cutoff| {
                let expected = Utc::now() - Duration::days(30);
                (*cutoff - expected).num_seconds().abs() < 5
            })
            .times(1)
            .returning(|_| Ok(12));

        let service = StatsService::new(Arc::new(history), Arc::new(MockLinkRepository::new()));

        assert_eq!(service.prune(30).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_prune_rejects_zero_days() {
        let service = StatsService::new(
            Arc::new(MockHistoryRepository::new()),
            Arc::new(MockLinkRepository::new()),
        );

        assert!(matches!(service.prune(0).await, Err(AppError::Validation { .. })));
    }
}
