//! Business logic services for the application layer.

pub mod click_recorder;
pub mod domain_service;
pub mod link_service;
pub mod redirect_service;
pub mod resolver;
pub mod stats_service;

pub use click_recorder::ClickRecorder;
pub use domain_service::DomainService;
pub use link_service::{CreateLink, LinkService};
pub use redirect_service::{RedirectResult, RedirectService};
pub use resolver::{DomainContext, MissReason, Resolution, ResolvedLink, Resolver};
pub use stats_service::StatsService;
