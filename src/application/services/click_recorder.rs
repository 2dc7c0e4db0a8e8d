//! Enrichment and persistence of visits.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_worker::ClickHandler;
use crate::domain::entities::{LinkHistory, NewLinkHistory};
use crate::domain::repositories::HistoryRepository;
use crate::error::AppError;
use crate::infrastructure::geo::{GeoLocator, UNKNOWN_COUNTRY};
use crate::utils::user_agent::parse_user_agent;

/// Default bound on a single geolocation lookup.
pub const DEFAULT_GEO_TIMEOUT: Duration = Duration::from_millis(1500);

/// Persistence attempts per visit, the first one included.
const PERSIST_ATTEMPTS: usize = 3;

/// Turns a [`ClickEvent`] into one `link_histories` row.
///
/// Parses the User-Agent, looks up the country under a timeout, and writes
/// the row, retrying transient storage failures with jittered exponential
/// backoff. Never reports failure to its caller: everything is logged and
/// counted instead.
pub struct ClickRecorder<H>
where
    H: HistoryRepository + ?Sized,
{
    history_repository: Arc<H>,
    geo: Arc<dyn GeoLocator>,
    geo_timeout: Duration,
    backoff_base_ms: u64,
}

impl<H> ClickRecorder<H>
where
    H: HistoryRepository + ?Sized,
{
    pub fn new(history_repository: Arc<H>, geo: Arc<dyn GeoLocator>) -> Self {
        Self {
            history_repository,
            geo,
            geo_timeout: DEFAULT_GEO_TIMEOUT,
            backoff_base_ms: 10,
        }
    }

    pub fn with_geo_timeout(mut self, timeout: Duration) -> Self {
        self.geo_timeout = timeout;
        self
    }

    /// Base delay of the first persistence retry, in milliseconds.
    pub fn with_backoff_base(mut self, millis: u64) -> Self {
        self.backoff_base_ms = millis.max(1);
        self
    }

    /// Records one visit.
    ///
    /// Returns the stored row, or `None` if it could not be written.
    pub async fn record(&self, event: ClickEvent) -> Option<LinkHistory> {
        let (browser, os) = parse_user_agent(event.user_agent.as_deref());
        let country_name = self.country_for(event.ip.as_deref()).await;

        let entry = NewLinkHistory {
            link_id: event.link_id,
            ip_address: event.ip,
            user_agent: event.user_agent,
            browser: browser.to_string(),
            os: os.to_string(),
            country_name,
            visited_at: event.visited_at,
        };

        let strategy = ExponentialBackoff::from_millis(self.backoff_base_ms)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(PERSIST_ATTEMPTS - 1);

        let result = RetryIf::spawn(
            strategy,
            || {
                let repo = self.history_repository.clone();
                let entry = entry.clone();
                async move { repo.record(entry).await }
            },
            |e: &AppError| {
                let transient = e.is_transient();
                if transient {
                    debug!("Retrying visit write for link {}: {}", entry.link_id, e);
                }
                transient
            },
        )
        .await;

        match result {
            Ok(row) => {
                metrics::counter!("click_events_recorded_total").increment(1);
                Some(row)
            }
            Err(e) => {
                metrics::counter!("click_events_failed_total").increment(1);
                error!("Failed to record visit for link {}: {}", entry.link_id, e);
                None
            }
        }
    }

    async fn country_for(&self, ip: Option<&str>) -> String {
        let Some(ip) = ip else {
            return UNKNOWN_COUNTRY.to_string();
        };

        match tokio::time::timeout(self.geo_timeout, self.geo.lookup_country(ip)).await {
            Ok(Some(country)) => country,
            Ok(None) => {
                metrics::counter!("geo_lookup_fallback_total", "reason" => "miss").increment(1);
                UNKNOWN_COUNTRY.to_string()
            }
            Err(_) => {
                metrics::counter!("geo_lookup_fallback_total", "reason" => "timeout").increment(1);
                debug!("Geolocation timed out for {}", ip);
                UNKNOWN_COUNTRY.to_string()
            }
        }
    }
}

#[async_trait]
impl<H> ClickHandler for ClickRecorder<H>
where
    H: HistoryRepository + ?Sized + 'static,
{
    async fn handle(&self, event: ClickEvent) {
        self.record(event).await;
    }
}
