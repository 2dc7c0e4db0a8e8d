//! DTOs for link statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{DateFilterParams, PaginationParams};
use crate::domain::entities::{Bucket, ClickSummary, LinkHistory};

/// A labelled count in a breakdown.
#[derive(Debug, Serialize, Deserialize)]
pub struct BucketItem {
    pub label: String,
    pub count: i64,
}

impl From<Bucket> for BucketItem {
    fn from(b: Bucket) -> Self {
        Self {
            label: b.label,
            count: b.count,
        }
    }
}

/// Aggregated click numbers of one link.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub link_id: i64,
    pub short_name: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub total: i64,
    pub unique_visitors: i64,
    pub browsers: Vec<BucketItem>,
    pub operating_systems: Vec<BucketItem>,
    pub countries: Vec<BucketItem>,
}

impl StatsResponse {
    pub fn new(link_id: i64, short_name: String, range: &DateFilterParams, summary: ClickSummary) -> Self {
        Self {
            link_id,
            short_name,
            from: range.from,
            to: range.to,
            total: summary.total,
            unique_visitors: summary.unique_visitors,
            browsers: summary.browsers.into_iter().map(Into::into).collect(),
            operating_systems: summary.operating_systems.into_iter().map(Into::into).collect(),
            countries: summary.countries.into_iter().map(Into::into).collect(),
        }
    }
}

/// One recorded visit.
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitItem {
    pub visited_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    pub browser: String,
    pub os: String,
    pub country: String,
}

impl From<LinkHistory> for VisitItem {
    fn from(h: LinkHistory) -> Self {
        Self {
            visited_at: h.created_at,
            ip: h.ip_address,
            user_agent: h.user_agent,
            browser: h.browser,
            os: h.os,
            country: h.country_name,
        }
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
}

impl From<&PaginationParams> for PaginationMeta {
    fn from(p: &PaginationParams) -> Self {
        Self {
            page: p.page(),
            page_size: p.page_size(),
        }
    }
}

/// One page of visits of a link, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub link_id: i64,
    pub pagination: PaginationMeta,
    pub items: Vec<VisitItem>,
}
