//! Link store implementations.
//!
//! Concrete implementations of domain repository traits. The PostgreSQL
//! repositories use SQLx runtime queries mapped through `FromRow` structs;
//! [`MemoryStore`] keeps everything in process.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage and retrieval
//! - [`PgDomainRepository`] - Domain management
//! - [`PgHistoryRepository`] - Visit rows and aggregated read queries
//! - [`MemoryStore`] - All three over shared in-process tables

pub mod memory;
pub mod pg_domain_repository;
pub mod pg_history_repository;
pub mod pg_link_repository;

pub use memory::MemoryStore;
pub use pg_domain_repository::PgDomainRepository;
pub use pg_history_repository::PgHistoryRepository;
pub use pg_link_repository::PgLinkRepository;
