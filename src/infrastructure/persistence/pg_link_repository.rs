//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, LinkDomain, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::{AppError, map_link_insert_error};

/// Columns of a link joined with its domain, `l` and `d` aliases.
macro_rules! link_columns {
    () => {
        "l.id, l.user_id, l.domain_id, l.custom_name, l.destination, l.short_name, \
         l.available, l.deleted_at, l.created_at, l.updated_at, \
         d.name AS domain_name, d.available AS domain_available, d.deleted_at AS domain_deleted_at"
    };
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    user_id: Option<i64>,
    domain_id: Option<i64>,
    custom_name: Option<String>,
    destination: String,
    short_name: String,
    available: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    domain_name: Option<String>,
    domain_available: Option<bool>,
    domain_deleted_at: Option<DateTime<Utc>>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        let domain = match (r.domain_id, r.domain_name) {
            (Some(id), Some(name)) => Some(LinkDomain {
                id,
                name,
                available: r.domain_available.unwrap_or(false),
                deleted_at: r.domain_deleted_at,
            }),
            _ => None,
        };

        Link {
            id: r.id,
            user_id: r.user_id,
            domain,
            custom_name: r.custom_name,
            destination: r.destination,
            short_name: r.short_name,
            available: r.available,
            deleted_at: r.deleted_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// The `links_short_name_key` unique constraint is the only arbiter of
/// short-name uniqueness.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(concat!(
            r#"
            WITH inserted AS (
                INSERT INTO links (short_name, destination, user_id, domain_id, custom_name)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT "#,
            link_columns!(),
            r#"
            FROM inserted l
            LEFT JOIN domains d ON d.id = l.domain_id
            "#
        ))
        .bind(&new_link.short_name)
        .bind(&new_link.destination)
        .bind(new_link.user_id)
        .bind(new_link.domain_id)
        .bind(&new_link.custom_name)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            if e
                .as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation())
            {
                return AppError::bad_request(
                    "Domain does not exist",
                    json!({ "domain_id": new_link.domain_id }),
                );
            }
            map_link_insert_error(e, &new_link.short_name)
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(concat!(
            "SELECT ",
            link_columns!(),
            r#"
            FROM links l
            LEFT JOIN domains d ON d.id = l.domain_id
            WHERE l.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn find_by_code(
        &self,
        code: &str,
        domain_id: Option<i64>,
    ) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(concat!(
            "SELECT ",
            link_columns!(),
            r#"
            FROM links l
            LEFT JOIN domains d ON d.id = l.domain_id
            WHERE l.short_name = $1
              AND l.deleted_at IS NULL
              AND ($2::bigint IS NULL OR l.domain_id = $2)
            "#
        ))
        .bind(code)
        .bind(domain_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let set_custom_name = patch.custom_name.is_some();
        let custom_name = patch.custom_name.flatten();

        let row = sqlx::query_as::<_, LinkRow>(concat!(
            r#"
            WITH updated AS (
                UPDATE links
                SET destination = COALESCE($2, destination),
                    custom_name = CASE WHEN $3 THEN $4 ELSE custom_name END,
                    available = COALESCE($5, available),
                    updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
            )
            SELECT "#,
            link_columns!(),
            r#"
            FROM updated l
            LEFT JOIN domains d ON d.id = l.domain_id
            "#
        ))
        .bind(id)
        .bind(patch.destination)
        .bind(set_custom_name)
        .bind(custom_name)
        .bind(patch.available)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Link::from)
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge(&self, id: i64) -> Result<bool, AppError> {
        // link_histories.link_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn codes_for_domain(&self, domain_id: i64) -> Result<Vec<String>, AppError> {
        let codes = sqlx::query_scalar::<_, String>(
            "SELECT short_name FROM links WHERE domain_id = $1 ORDER BY id",
        )
        .bind(domain_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(codes)
    }

    async fn detach_domain(&self, domain_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE links SET domain_id = NULL, updated_at = NOW() WHERE domain_id = $1",
        )
        .bind(domain_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn disable_by_domain(&self, domain_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET available = FALSE, updated_at = NOW()
            WHERE domain_id = $1 AND available
            "#,
        )
        .bind(domain_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
