//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the link store. Concrete implementations live in
//! `crate::infrastructure::persistence`.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Link insert-or-fail, lookups, updates, soft delete
//! - [`DomainRepository`] - Domain management
//! - [`HistoryRepository`] - Click history and aggregated read queries
//!
//! # Testing
//!
//! Mock implementations are generated via `mockall` for unit tests.
//! See `tests/` for usage against the in-memory store.

pub mod domain_repository;
pub mod history_repository;
pub mod link_repository;

pub use domain_repository::DomainRepository;
pub use history_repository::{HistoryFilter, HistoryRepository};
pub use link_repository::LinkRepository;

#[cfg(test)]
pub use domain_repository::MockDomainRepository;
#[cfg(test)]
pub use history_repository::MockHistoryRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
