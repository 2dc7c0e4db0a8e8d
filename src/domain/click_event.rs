//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

/// An in-memory representation of a visit waiting to be recorded.
///
/// Passed from the redirect path to the background worker over a bounded
/// channel, so the redirect response never waits on the history write.
///
/// # Usage Flow
///
/// 1. Created by [`crate::application::services::RedirectService`] on a hit
/// 2. Sent to the channel with `try_send` (dropped if the queue is full)
/// 3. Processed by [`crate::domain::click_worker::run_click_worker`]
/// 4. Enriched and persisted by [`crate::application::services::ClickRecorder`]
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub link_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub visited_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a click event stamped with the current time.
    pub fn new(link_id: i64, ip: Option<String>, user_agent: Option<&str>) -> Self {
        Self {
            link_id,
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
            visited_at: Utc::now(),
        }
    }
}
