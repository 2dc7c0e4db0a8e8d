//! PostgreSQL implementation of domain repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Domain, NewDomain, UpdateDomain};
use crate::domain::repositories::DomainRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct DomainRow {
    id: i64,
    name: String,
    available: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DomainRow> for Domain {
    fn from(r: DomainRow) -> Self {
        Domain {
            id: r.id,
            name: r.name,
            available: r.available,
            deleted_at: r.deleted_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn name_taken(e: sqlx::Error, name: &str) -> AppError {
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        return AppError::conflict("Domain already exists", json!({ "name": name }));
    }
    AppError::from(e)
}

/// PostgreSQL repository for domain management.
///
/// Uses soft delete: `deleted_at IS NOT NULL` means deleted.
pub struct PgDomainRepository {
    pool: Arc<PgPool>,
}

impl PgDomainRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for PgDomainRepository {
    async fn create(&self, new_domain: NewDomain) -> Result<Domain, AppError> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            INSERT INTO domains (name)
            VALUES ($1)
            RETURNING id, name, available, deleted_at, created_at, updated_at
            "#,
        )
        .bind(&new_domain.name)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| name_taken(e, &new_domain.name))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Domain>, AppError> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, name, available, deleted_at, created_at, updated_at
            FROM domains
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Domain::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>, AppError> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, name, available, deleted_at, created_at, updated_at
            FROM domains
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Domain::from))
    }

    async fn list(&self, only_available: bool) -> Result<Vec<Domain>, AppError> {
        let rows = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, name, available, deleted_at, created_at, updated_at
            FROM domains
            WHERE deleted_at IS NULL
              AND (NOT $1 OR available)
            ORDER BY name ASC
            "#,
        )
        .bind(only_available)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Domain::from).collect())
    }

    async fn update(&self, id: i64, update: UpdateDomain) -> Result<Domain, AppError> {
        let new_name = update.name.clone();

        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            UPDATE domains
            SET name = COALESCE($2, name),
                available = COALESCE($3, available),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, available, deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.available)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| name_taken(e, new_name.as_deref().unwrap_or_default()))?;

        row.map(Domain::from)
            .ok_or_else(|| AppError::not_found("Domain not found", json!({ "id": id })))
    }

    async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE domains
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Domain not found", json!({ "id": id })));
        }

        Ok(())
    }

    async fn count_links(&self, domain_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM links WHERE domain_id = $1 AND deleted_at IS NULL",
        )
        .bind(domain_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
