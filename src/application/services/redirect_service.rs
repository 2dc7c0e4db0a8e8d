//! Per-request redirect orchestration.

use axum::http::StatusCode;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::resolver::{DomainContext, Resolution, Resolver};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{DomainRepository, LinkRepository};
use crate::error::AppError;
use crate::utils::host::normalize_host;

/// Outcome of handling one short-link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectResult {
    Redirect { location: String, status: StatusCode },
    /// Rendered the same way whether the code is unknown or unavailable.
    NotFound,
}

/// Resolves inbound short-link requests and hands visits to the click
/// queue without waiting for them to be recorded.
pub struct RedirectService<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    resolver: Arc<Resolver<L, D>>,
    click_sender: mpsc::Sender<ClickEvent>,
    primary_hosts: HashSet<String>,
}

impl<L, D> RedirectService<L, D>
where
    L: LinkRepository + ?Sized,
    D: DomainRepository + ?Sized,
{
    /// `primary_hosts` are matched case-insensitively and without port.
    pub fn new<I, S>(
        resolver: Arc<Resolver<L, D>>,
        click_sender: mpsc::Sender<ClickEvent>,
        primary_hosts: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            resolver,
            click_sender,
            primary_hosts: primary_hosts
                .into_iter()
                .map(|h| normalize_host(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Maps a raw `Host` header to the context codes are resolved under.
    ///
    /// A missing host is treated as a primary host.
    pub fn domain_context(&self, host: Option<&str>) -> DomainContext {
        match host.map(normalize_host) {
            Some(name) if !name.is_empty() && !self.primary_hosts.contains(&name) => {
                DomainContext::Host(name)
            }
            _ => DomainContext::Default,
        }
    }

    /// Handles one request for `path` on `host`.
    ///
    /// On a hit the visit is queued with `try_send`; a full or closed queue
    /// drops the visit and the redirect still succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] only if the store cannot be read.
    pub async fn handle(
        &self,
        host: Option<&str>,
        path: &str,
        client_ip: Option<String>,
        user_agent: Option<&str>,
    ) -> Result<RedirectResult, AppError> {
        let code = path.strip_prefix('/').unwrap_or(path);
        if code.is_empty() {
            metrics::counter!("redirect_requests_total", "outcome" => "not_found").increment(1);
            return Ok(RedirectResult::NotFound);
        }

        let context = self.domain_context(host);

        let resolved = match self.resolver.resolve(code, &context).await? {
            Resolution::Destination(resolved) => resolved,
            Resolution::Miss(reason) => {
                info!(code, ?context, reason = reason.as_str(), "Short link miss");
                metrics::counter!("redirect_requests_total", "outcome" => reason.as_str())
                    .increment(1);
                return Ok(RedirectResult::NotFound);
            }
        };

        metrics::counter!("redirect_requests_total", "outcome" => "redirect").increment(1);

        let event = ClickEvent::new(resolved.link_id, client_ip, user_agent);
        match self.click_sender.try_send(event) {
            Ok(()) => debug!("Queued visit for link {}", resolved.link_id),
            Err(TrySendError::Full(_)) => {
                metrics::counter!("click_events_dropped_total", "reason" => "queue_full")
                    .increment(1);
                warn!("Click queue full, dropping visit for link {}", resolved.link_id);
            }
            Err(TrySendError::Closed(_)) => {
                metrics::counter!("click_events_dropped_total", "reason" => "queue_closed")
                    .increment(1);
                warn!("Click queue closed, dropping visit for link {}", resolved.link_id);
            }
        }

        Ok(RedirectResult::Redirect {
            location: resolved.destination,
            status: StatusCode::FOUND,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::link::fixtures::link;
    use crate::domain::repositories::{MockDomainRepository, MockLinkRepository};
    use crate::infrastructure::cache::NullCache;

    fn service_with(
        links: MockLinkRepository,
        capacity: usize,
    ) -> (
        RedirectService<MockLinkRepository, MockDomainRepository>,
        mpsc::Receiver<ClickEvent>,
    ) {
        let resolver = Arc::new(Resolver::new(
            Arc::new(links),
            Arc::new(MockDomainRepository::new()),
            Arc::new(NullCache::new()),
        ));
        let (tx, rx) = mpsc::channel(capacity);
        (RedirectService::new(resolver, tx, ["localhost", "Sho.rt:8080"]), rx)
    }

    fn hit() -> MockLinkRepository {
        let mut links = MockLinkRepository::new();
        links
            .expect_find_by_code()
            .returning(|code, _| Ok(Some(link(5, code, "https://example.org/page"))));
        links
    }

    #[test]
    fn test_domain_context_mapping() {
        let (svc, _rx) = service_with(MockLinkRepository::new(), 1);

        assert_eq!(svc.domain_context(None), DomainContext::Default);
        assert_eq!(svc.domain_context(Some("localhost:3000")), DomainContext::Default);
        assert_eq!(svc.domain_context(Some("SHO.RT")), DomainContext::Default);
        assert_eq!(
            svc.domain_context(Some("Go.Example.com:443")),
            DomainContext::Host("go.example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_hit_redirects_and_queues_visit() {
        let (svc, mut rx) = service_with(hit(), 4);

        let result = svc
            .handle(Some("localhost"), "/abc1234", Some("203.0.113.1".to_string()), Some("curl/8"))
            .await
            .unwrap();

        assert_eq!(
            result,
            RedirectResult::Redirect {
                location: "https://example.org/page".to_string(),
                status: StatusCode::FOUND,
            }
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.link_id, 5);
        assert_eq!(event.ip.as_deref(), Some("203.0.113.1"));
        assert_eq!(event.user_agent.as_deref(), Some("curl/8"));
    }

    #[tokio::test]
    async fn test_empty_code_is_not_found() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().times(0);
        let (svc, _rx) = service_with(links, 1);

        assert_eq!(
            svc.handle(None, "/", None, None).await.unwrap(),
            RedirectResult::NotFound
        );
        assert_eq!(
            svc.handle(None, "", None, None).await.unwrap(),
            RedirectResult::NotFound
        );
    }

    #[tokio::test]
    async fn test_miss_queues_nothing() {
        let mut links = MockLinkRepository::new();
        links.expect_find_by_code().returning(|_, _| Ok(None));
        let (svc, mut rx) = service_with(links, 1);

        assert_eq!(
            svc.handle(None, "/missing", None, None).await.unwrap(),
            RedirectResult::NotFound
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_still_redirects() {
        let (svc, mut rx) = service_with(hit(), 1);

        for _ in 0..3 {
            let result = svc.handle(None, "/abc1234", None, None).await.unwrap();
            assert!(matches!(result, RedirectResult::Redirect { .. }));
        }

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_still_redirects() {
        let (svc, rx) = service_with(hit(), 1);
        drop(rx);

        let result = svc.handle(None, "/abc1234", None, None).await.unwrap();
        assert!(matches!(result, RedirectResult::Redirect { .. }));
    }
}
