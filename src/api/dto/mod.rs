//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs are validated with `validator`; responses are plain Serde
//! structs built from domain entities.

pub mod health;
pub mod links;
pub mod pagination;
pub mod stats;
