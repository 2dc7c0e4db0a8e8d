#![allow(dead_code)]

use axum::Router;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use shortlink::domain::click_event::ClickEvent;
use shortlink::infrastructure::cache::{CacheService, NullCache};
use shortlink::infrastructure::persistence::MemoryStore;
use shortlink::routes::app_router;
use shortlink::state::{AppState, Backends, StateOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::Layer;

pub const PEER: &str = "203.0.113.10:41000";

/// Inserts a fixed peer address, standing in for
/// `into_make_service_with_connect_info` in tests.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = PEER.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

pub fn options() -> StateOptions {
    StateOptions {
        base_url: "https://sho.rt".to_string(),
        primary_hosts: vec!["sho.rt".to_string(), "localhost".to_string()],
        ..StateOptions::default()
    }
}

/// State over a fresh in-memory store with caching disabled.
pub fn create_test_state(
    queue_capacity: usize,
) -> (AppState, Arc<MemoryStore>, mpsc::Receiver<ClickEvent>) {
    create_test_state_with_cache(queue_capacity, Arc::new(NullCache::new()))
}

pub fn create_test_state_with_cache(
    queue_capacity: usize,
    cache: Arc<dyn CacheService>,
) -> (AppState, Arc<MemoryStore>, mpsc::Receiver<ClickEvent>) {
    let store = Arc::new(MemoryStore::new());
    let (tx, rx) = mpsc::channel(queue_capacity);

    let state = AppState::build(
        Backends {
            links: store.clone(),
            domains: store.clone(),
            history: store.clone(),
            cache,
        },
        tx,
        options(),
    );

    (state, store, rx)
}

/// The full application router over a fresh in-memory store.
pub fn test_app() -> TestApp {
    test_app_with_queue(100)
}

pub fn test_app_with_queue(queue_capacity: usize) -> TestApp {
    let (state, store, clicks) = create_test_state(queue_capacity);

    let app = app_router(state.clone(), false).unwrap();
    let router = Router::new()
        .fallback_service(app)
        .layer(MockConnectInfoLayer);

    TestApp {
        server: TestServer::new(router).unwrap(),
        state,
        store,
        clicks,
    }
}
