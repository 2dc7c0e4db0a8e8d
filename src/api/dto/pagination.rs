//! Pagination and date-range query parameters.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::application::services::stats_service::MAX_PAGE_SIZE;
use crate::domain::repositories::HistoryFilter;

const DEFAULT_PAGE_SIZE: u32 = 25;

/// Pagination query parameters.
///
/// Query strings carry everything as text, so numbers go through
/// `DisplayFromStr`.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Converts page numbers into an `(offset, limit)` pair.
    ///
    /// Page must be > 0 and page size between 1 and [`MAX_PAGE_SIZE`].
    pub fn validate_and_get_offset_limit(&self) -> Result<(i64, i64), String> {
        let page = self.page();
        let page_size = self.page_size();

        if page == 0 {
            return Err("Page must be greater than 0".to_string());
        }

        if page_size == 0 || i64::from(page_size) > MAX_PAGE_SIZE {
            return Err(format!("Page size must be between 1 and {}", MAX_PAGE_SIZE));
        }

        let offset = i64::from(page - 1) * i64::from(page_size);
        Ok((offset, i64::from(page_size)))
    }
}

/// Date range filtering parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DateFilterParams {
    #[serde(default, with = "optional_rfc3339")]
    pub from: Option<DateTime<Utc>>,

    #[serde(default, with = "optional_rfc3339")]
    pub to: Option<DateTime<Utc>>,
}

impl DateFilterParams {
    /// Summary queries ignore pagination; only the range matters.
    pub fn to_filter(&self) -> HistoryFilter {
        HistoryFilter::default().with_date_range(self.from, self.to)
    }
}

mod optional_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Query parameters of the visit listing.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQueryParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    #[serde(flatten)]
    pub date_filter: DateFilterParams,
}

impl HistoryQueryParams {
    pub fn to_filter(&self) -> Result<HistoryFilter, String> {
        let (offset, limit) = self.pagination.validate_and_get_offset_limit()?;
        Ok(HistoryFilter::new(offset, limit)
            .with_date_range(self.date_filter.from, self.date_filter.to))
    }
}
