//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching and geolocation.
//!
//! # Modules
//!
//! - [`cache`] - Caching abstractions (Redis, in-process and no-op implementations)
//! - [`geo`] - IP to country lookups
//! - [`persistence`] - PostgreSQL and in-memory repository implementations

pub mod cache;
pub mod geo;
pub mod persistence;
