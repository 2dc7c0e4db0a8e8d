//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, caching and the click queue. Services consume repository traits
//! and provide a clean API for HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation and lifecycle
//! - [`services::resolver::Resolver`] - Code to destination resolution
//! - [`services::redirect_service::RedirectService`] - Per-request redirect handling
//! - [`services::click_recorder::ClickRecorder`] - Visit enrichment and persistence
//! - [`services::domain_service::DomainService`] - Domain management
//! - [`services::stats_service::StatsService`] - Click statistics and retention

pub mod services;
