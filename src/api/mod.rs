//! HTTP surface over the redirect core.
//!
//! # Modules
//!
//! - [`dto`] - Request and response bodies
//! - [`extract`] - The acting-user extractor
//! - [`handlers`] - Endpoint handlers
//! - [`middleware`] - Rate limiting and request tracing
//! - [`routes`] - Link management routes

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
