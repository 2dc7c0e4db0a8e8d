//! Click event rows recorded for every redirect.

use chrono::{DateTime, Utc};

/// One recorded visit to a short link.
///
/// `link_id` is a weak reference: it becomes `None` once the link is purged,
/// while the row itself is kept. Rows are never updated after insertion,
/// only soft-deleted by retention.
#[derive(Debug, Clone)]
pub struct LinkHistory {
    pub id: i64,
    pub link_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub browser: String,
    pub os: String,
    pub country_name: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input data for recording a visit.
///
/// `visited_at` is taken when the redirect was served, not when the row is
/// written, so queue delay does not skew timestamps.
#[derive(Debug, Clone)]
pub struct NewLinkHistory {
    pub link_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub browser: String,
    pub os: String,
    pub country_name: String,
    pub visited_at: DateTime<Utc>,
}

/// A labelled count in a click breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub count: i64,
}

/// Aggregated click numbers for one link.
///
/// Bucket lists are sorted by count, highest first.
#[derive(Debug, Clone, Default)]
pub struct ClickSummary {
    pub total: i64,
    pub unique_visitors: i64,
    pub browsers: Vec<Bucket>,
    pub operating_systems: Vec<Bucket>,
    pub countries: Vec<Bucket>,
}
