//! PostgreSQL implementation of the click history repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Bucket, ClickSummary, LinkHistory, NewLinkHistory};
use crate::domain::repositories::{HistoryFilter, HistoryRepository};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    link_id: Option<i64>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    browser: String,
    os: String,
    country_name: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<HistoryRow> for LinkHistory {
    fn from(r: HistoryRow) -> Self {
        LinkHistory {
            id: r.id,
            link_id: r.link_id,
            ip_address: r.ip_address,
            user_agent: r.user_agent,
            browser: r.browser,
            os: r.os,
            country_name: r.country_name,
            created_at: r.created_at,
            deleted_at: r.deleted_at,
        }
    }
}

/// Dimensions a summary can be broken down by.
#[derive(Clone, Copy)]
enum Dimension {
    Browser,
    Os,
    Country,
}

impl Dimension {
    fn sql(self) -> &'static str {
        match self {
            Dimension::Browser => {
                r#"
                SELECT browser, COUNT(*) AS count
                FROM link_histories
                WHERE link_id = $1 AND deleted_at IS NULL
                  AND ($2::timestamptz IS NULL OR created_at >= $2)
                  AND ($3::timestamptz IS NULL OR created_at <= $3)
                GROUP BY browser
                ORDER BY count DESC, browser ASC
                "#
            }
            Dimension::Os => {
                r#"
                SELECT os, COUNT(*) AS count
                FROM link_histories
                WHERE link_id = $1 AND deleted_at IS NULL
                  AND ($2::timestamptz IS NULL OR created_at >= $2)
                  AND ($3::timestamptz IS NULL OR created_at <= $3)
                GROUP BY os
                ORDER BY count DESC, os ASC
                "#
            }
            Dimension::Country => {
                r#"
                SELECT country_name, COUNT(*) AS count
                FROM link_histories
                WHERE link_id = $1 AND deleted_at IS NULL
                  AND ($2::timestamptz IS NULL OR created_at >= $2)
                  AND ($3::timestamptz IS NULL OR created_at <= $3)
                GROUP BY country_name
                ORDER BY count DESC, country_name ASC
                "#
            }
        }
    }
}

/// PostgreSQL repository for recorded visits and their aggregates.
///
/// Rows are append-only; retention only sets `deleted_at`.
pub struct PgHistoryRepository {
    pool: Arc<PgPool>,
}

impl PgHistoryRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn buckets(
        &self,
        dimension: Dimension,
        link_id: i64,
        filter: &HistoryFilter,
    ) -> Result<Vec<Bucket>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(dimension.sql())
            .bind(link_id)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(label, count)| Bucket { label, count })
            .collect())
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn record(&self, entry: NewLinkHistory) -> Result<LinkHistory, AppError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            INSERT INTO link_histories
                (link_id, ip_address, user_agent, browser, os, country_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, link_id, ip_address, user_agent, browser, os, country_name,
                      created_at, deleted_at
            "#,
        )
        .bind(entry.link_id)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.browser)
        .bind(&entry.os)
        .bind(&entry.country_name)
        .bind(entry.visited_at)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            if e
                .as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation())
            {
                return AppError::bad_request(
                    "Link does not exist",
                    json!({ "link_id": entry.link_id }),
                );
            }
            AppError::from(e)
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkHistory>, AppError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, link_id, ip_address, user_agent, browser, os, country_name,
                   created_at, deleted_at
            FROM link_histories
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(LinkHistory::from))
    }

    async fn list_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<Vec<LinkHistory>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, link_id, ip_address, user_agent, browser, os, country_name,
                   created_at, deleted_at
            FROM link_histories
            WHERE link_id = $1
              AND deleted_at IS NULL
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(link_id)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(LinkHistory::from).collect())
    }

    async fn summary_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<ClickSummary, AppError> {
        let (total, unique_visitors) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(DISTINCT ip_address)
            FROM link_histories
            WHERE link_id = $1
              AND deleted_at IS NULL
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            "#,
        )
        .bind(link_id)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(ClickSummary {
            total,
            unique_visitors,
            browsers: self.buckets(Dimension::Browser, link_id, &filter).await?,
            operating_systems: self.buckets(Dimension::Os, link_id, &filter).await?,
            countries: self.buckets(Dimension::Country, link_id, &filter).await?,
        })
    }

    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE link_histories
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE created_at < $1 AND deleted_at IS NULL
            "#,
        )
        .bind(cutoff)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
