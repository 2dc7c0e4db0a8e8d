//! In-process link store.
//!
//! Implements every repository trait over one set of tables guarded by a
//! single lock, so it mirrors the constraints PostgreSQL enforces: unique
//! short names, unique domain names, referential checks and
//! `ON DELETE SET NULL` on history rows. Used when no database is
//! configured and by the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::entities::{
    Bucket, ClickSummary, Domain, Link, LinkHistory, LinkPatch, NewDomain, NewLink,
    NewLinkHistory, UpdateDomain,
};
use crate::domain::repositories::{
    DomainRepository, HistoryFilter, HistoryRepository, LinkRepository,
};
use crate::error::AppError;

#[derive(Debug, Clone)]
struct StoredLink {
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
}

#[derive(Default)]
struct Tables {
    domains: BTreeMap<i64, Domain>,
    links: BTreeMap<i64, StoredLink>,
    short_names: HashMap<String, i64>,
    histories: Vec<LinkHistory>,
    next_domain_id: i64,
    next_link_id: i64,
    next_history_id: i64,
}

impl Tables {
    fn materialize(&self, stored: &StoredLink) -> Link {
        Link {
            id: stored.id,
            user_id: stored.user_id,
            domain: stored
                .domain_id
                .and_then(|id| self.domains.get(&id))
                .map(Domain::as_link_domain),
            custom_name: stored.custom_name.clone(),
            destination: stored.destination.clone(),
            short_name: stored.short_name.clone(),
            available: stored.available,
            deleted_at: stored.deleted_at,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    fn live_history<'a>(
        &'a self,
        link_id: i64,
        filter: &'a HistoryFilter,
    ) -> impl Iterator<Item = &'a LinkHistory> + 'a {
        self.histories.iter().filter(move |h| {
            h.link_id == Some(link_id) && h.deleted_at.is_none() && filter.covers(h.created_at)
        })
    }
}

fn buckets<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Bucket> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(label, count)| Bucket {
            label: label.to_string(),
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    buckets
}

fn poisoned() -> AppError {
    AppError::internal("In-memory store lock poisoned", json!({}))
}

/// Shared in-memory implementation of the link store.
///
/// Cloning is cheap and every clone sees the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.tables.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut tables = self.write()?;

        if let Some(domain_id) = new_link.domain_id
            && !tables.domains.contains_key(&domain_id)
        {
            return Err(AppError::bad_request(
                "Domain does not exist",
                json!({ "domain_id": domain_id }),
            ));
        }

        if tables.short_names.contains_key(&new_link.short_name) {
            return Err(AppError::duplicate_code(new_link.short_name));
        }

        tables.next_link_id += 1;
        let now = Utc::now();
        let stored = StoredLink {
            id: tables.next_link_id,
            user_id: new_link.user_id,
            domain_id: new_link.domain_id,
            custom_name: new_link.custom_name,
            destination: new_link.destination,
            short_name: new_link.short_name,
            available: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        tables
            .short_names
            .insert(stored.short_name.clone(), stored.id);
        tables.links.insert(stored.id, stored.clone());

        Ok(tables.materialize(&stored))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let tables = self.read()?;
        Ok(tables.links.get(&id).map(|l| tables.materialize(l)))
    }

    async fn find_by_code(
        &self,
        code: &str,
        domain_id: Option<i64>,
    ) -> Result<Option<Link>, AppError> {
        let tables = self.read()?;

        Ok(tables
            .short_names
            .get(code)
            .and_then(|id| tables.links.get(id))
            .filter(|l| l.deleted_at.is_none())
            .filter(|l| domain_id.is_none() || l.domain_id == domain_id)
            .map(|l| tables.materialize(l)))
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let mut tables = self.write()?;

        let stored = tables
            .links
            .get_mut(&id)
            .filter(|l| l.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;

        if let Some(destination) = patch.destination {
            stored.destination = destination;
        }
        if let Some(custom_name) = patch.custom_name {
            stored.custom_name = custom_name;
        }
        if let Some(available) = patch.available {
            stored.available = available;
        }
        stored.updated_at = Utc::now();

        let stored = stored.clone();
        Ok(tables.materialize(&stored))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.write()?;

        match tables.links.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() => {
                let now = Utc::now();
                stored.deleted_at = Some(now);
                stored.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.write()?;

        if !tables
            .links
            .get(&id)
            .is_some_and(|l| l.deleted_at.is_some())
        {
            return Ok(false);
        }

        if let Some(stored) = tables.links.remove(&id) {
            tables.short_names.remove(&stored.short_name);
        }

        for history in tables
            .histories
            .iter_mut()
            .filter(|h| h.link_id == Some(id))
        {
            history.link_id = None;
        }

        Ok(true)
    }

    async fn codes_for_domain(&self, domain_id: i64) -> Result<Vec<String>, AppError> {
        let tables = self.read()?;

        Ok(tables
            .links
            .values()
            .filter(|l| l.domain_id == Some(domain_id))
            .map(|l| l.short_name.clone())
            .collect())
    }

    async fn detach_domain(&self, domain_id: i64) -> Result<u64, AppError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let mut moved = 0;

        for stored in tables
            .links
            .values_mut()
            .filter(|l| l.domain_id == Some(domain_id))
        {
            stored.domain_id = None;
            stored.updated_at = now;
            moved += 1;
        }

        Ok(moved)
    }

    async fn disable_by_domain(&self, domain_id: i64) -> Result<u64, AppError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let mut changed = 0;

        for stored in tables
            .links
            .values_mut()
            .filter(|l| l.domain_id == Some(domain_id) && l.available)
        {
            stored.available = false;
            stored.updated_at = now;
            changed += 1;
        }

        Ok(changed)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl DomainRepository for MemoryStore {
    async fn create(&self, new_domain: NewDomain) -> Result<Domain, AppError> {
        let mut tables = self.write()?;

        if tables.domains.values().any(|d| d.name == new_domain.name) {
            return Err(AppError::conflict(
                "Domain already exists",
                json!({ "name": new_domain.name }),
            ));
        }

        tables.next_domain_id += 1;
        let now = Utc::now();
        let domain = Domain {
            id: tables.next_domain_id,
            name: new_domain.name,
            available: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.domains.insert(domain.id, domain.clone());

        Ok(domain)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Domain>, AppError> {
        Ok(self.read()?.domains.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>, AppError> {
        Ok(self
            .read()?
            .domains
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn list(&self, only_available: bool) -> Result<Vec<Domain>, AppError> {
        let mut domains: Vec<Domain> = self
            .read()?
            .domains
            .values()
            .filter(|d| !d.is_deleted() && (!only_available || d.available))
            .cloned()
            .collect();
        domains.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(domains)
    }

    async fn update(&self, id: i64, update: UpdateDomain) -> Result<Domain, AppError> {
        let mut tables = self.write()?;

        if let Some(name) = &update.name
            && tables
                .domains
                .values()
                .any(|d| d.id != id && &d.name == name)
        {
            return Err(AppError::conflict(
                "Domain already exists",
                json!({ "name": name }),
            ));
        }

        let domain = tables
            .domains
            .get_mut(&id)
            .filter(|d| !d.is_deleted())
            .ok_or_else(|| AppError::not_found("Domain not found", json!({ "id": id })))?;

        if let Some(name) = update.name {
            domain.name = name;
        }
        if let Some(available) = update.available {
            domain.available = available;
        }
        domain.updated_at = Utc::now();

        Ok(domain.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.write()?;

        let domain = tables
            .domains
            .get_mut(&id)
            .filter(|d| !d.is_deleted())
            .ok_or_else(|| AppError::not_found("Domain not found", json!({ "id": id })))?;

        let now = Utc::now();
        domain.deleted_at = Some(now);
        domain.updated_at = now;

        Ok(())
    }

    async fn count_links(&self, domain_id: i64) -> Result<i64, AppError> {
        let count = self
            .read()?
            .links
            .values()
            .filter(|l| l.domain_id == Some(domain_id) && l.deleted_at.is_none())
            .count();

        Ok(count as i64)
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn record(&self, entry: NewLinkHistory) -> Result<LinkHistory, AppError> {
        let mut tables = self.write()?;

        if !tables.links.contains_key(&entry.link_id) {
            return Err(AppError::bad_request(
                "Link does not exist",
                json!({ "link_id": entry.link_id }),
            ));
        }

        tables.next_history_id += 1;
        let history = LinkHistory {
            id: tables.next_history_id,
            link_id: Some(entry.link_id),
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            browser: entry.browser,
            os: entry.os,
            country_name: entry.country_name,
            created_at: entry.visited_at,
            deleted_at: None,
        };
        tables.histories.push(history.clone());

        Ok(history)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkHistory>, AppError> {
        Ok(self
            .read()?
            .histories
            .iter()
            .find(|h| h.id == id && h.deleted_at.is_none())
            .cloned())
    }

    async fn list_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<Vec<LinkHistory>, AppError> {
        let tables = self.read()?;

        let mut rows: Vec<LinkHistory> = tables.live_history(link_id, &filter).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn summary_for_link(
        &self,
        link_id: i64,
        filter: HistoryFilter,
    ) -> Result<ClickSummary, AppError> {
        let tables = self.read()?;
        let rows: Vec<&LinkHistory> = tables.live_history(link_id, &filter).collect();

        let mut ips: Vec<&str> = rows.iter().filter_map(|h| h.ip_address.as_deref()).collect();
        ips.sort_unstable();
        ips.dedup();

        Ok(ClickSummary {
            total: rows.len() as i64,
            unique_visitors: ips.len() as i64,
            browsers: buckets(rows.iter().map(|h| h.browser.as_str())),
            operating_systems: buckets(rows.iter().map(|h| h.os.as_str())),
            countries: buckets(rows.iter().map(|h| h.country_name.as_str())),
        })
    }

    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let mut affected = 0;

        for history in tables
            .histories
            .iter_mut()
            .filter(|h| h.created_at < cutoff && h.deleted_at.is_none())
        {
            history.deleted_at = Some(now);
            affected += 1;
        }

        Ok(affected)
    }
}
