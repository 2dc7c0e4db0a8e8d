//! Shared application state passed to every handler.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{
    DomainService, LinkService, RedirectService, Resolver, StatsService,
};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{DomainRepository, HistoryRepository, LinkRepository};
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{CodeGenerator, DEFAULT_CODE_LENGTH, RandomCodeGenerator};

pub type AppLinkService = LinkService<dyn LinkRepository, dyn DomainRepository>;
pub type AppRedirectService = RedirectService<dyn LinkRepository, dyn DomainRepository>;
pub type AppDomainService = DomainService<dyn DomainRepository, dyn LinkRepository>;
pub type AppStatsService = StatsService<dyn HistoryRepository, dyn LinkRepository>;

/// Application state shared across all request handlers.
///
/// Cloned per request (all fields are `Arc` or cheap handles).
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<AppLinkService>,
    pub redirect_service: Arc<AppRedirectService>,
    pub domain_service: Arc<AppDomainService>,
    pub stats_service: Arc<AppStatsService>,
    /// Kept apart from the services for the health check.
    pub link_repository: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub click_sender: mpsc::Sender<ClickEvent>,
    /// Read the client IP from `X-Forwarded-For` / `X-Real-IP`.
    pub behind_proxy: bool,
}

/// Runtime knobs the services are built with.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub base_url: String,
    pub primary_hosts: Vec<String>,
    pub code_length: usize,
    pub cache_ttl_seconds: Option<u64>,
    pub behind_proxy: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            primary_hosts: vec!["localhost".to_string()],
            code_length: DEFAULT_CODE_LENGTH,
            cache_ttl_seconds: None,
            behind_proxy: false,
        }
    }
}

/// Storage and cache backends the state is assembled from.
pub struct Backends {
    pub links: Arc<dyn LinkRepository>,
    pub domains: Arc<dyn DomainRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub cache: Arc<dyn CacheService>,
}

impl AppState {
    /// Wires every service over the given backends.
    pub fn build(
        backends: Backends,
        click_sender: mpsc::Sender<ClickEvent>,
        options: StateOptions,
    ) -> Self {
        Self::build_with_generator(
            backends,
            click_sender,
            options,
            Arc::new(RandomCodeGenerator::alphanumeric()),
        )
    }

    /// Like [`AppState::build`] with a custom code generator.
    pub fn build_with_generator(
        backends: Backends,
        click_sender: mpsc::Sender<ClickEvent>,
        options: StateOptions,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        let Backends {
            links,
            domains,
            history,
            cache,
        } = backends;

        let link_service = Arc::new(
            LinkService::new(links.clone(), domains.clone(), cache.clone())
                .with_generator(generator, options.code_length)
                .with_base_url(options.base_url.clone()),
        );

        let mut resolver = Resolver::new(links.clone(), domains.clone(), cache.clone());
        if let Some(ttl) = options.cache_ttl_seconds {
            resolver = resolver.with_cache_ttl(ttl);
        }
        let redirect_service = Arc::new(RedirectService::new(
            Arc::new(resolver),
            click_sender.clone(),
            &options.primary_hosts,
        ));

        let domain_service = Arc::new(DomainService::new(
            domains.clone(),
            links.clone(),
            cache.clone(),
        ));
        let stats_service = Arc::new(StatsService::new(history, links.clone()));

        Self {
            link_service,
            redirect_service,
            domain_service,
            stats_service,
            link_repository: links,
            cache,
            click_sender,
            behind_proxy: options.behind_proxy,
        }
    }
}
