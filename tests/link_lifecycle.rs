mod common;

use shortlink::AppError;
use shortlink::application::services::{ClickRecorder, CreateLink, RedirectResult};
use shortlink::domain::click_event::ClickEvent;
use shortlink::domain::click_worker::run_click_worker;
use shortlink::domain::entities::{LinkPatch, OrphanPolicy};
use shortlink::domain::repositories::{HistoryFilter, HistoryRepository, LinkRepository};
use shortlink::infrastructure::cache::{MemoryCache, NullCache};
use shortlink::infrastructure::geo::NullLocator;
use shortlink::infrastructure::persistence::MemoryStore;
use shortlink::state::{AppState, Backends, StateOptions};
use shortlink::utils::code_generator::RandomCodeGenerator;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

fn create(destination: &str) -> CreateLink {
    CreateLink {
        destination: destination.to_string(),
        ..CreateLink::default()
    }
}

fn recorder(store: &Arc<MemoryStore>) -> ClickRecorder<MemoryStore> {
    ClickRecorder::new(store.clone(), Arc::new(NullLocator)).with_backoff_base(1)
}

async fn visit(state: &AppState, host: &str, code: &str) -> RedirectResult {
    state
        .redirect_service
        .handle(Some(host), code, Some("198.51.100.7".to_string()), None)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_resolve_record_scenario() {
    let (state, store, mut clicks) = common::create_test_state(16);
    let recorder = recorder(&store);

    let link = state
        .link_service
        .create(create("https://example.org/page"))
        .await
        .unwrap();

    let result = visit(&state, "sho.rt", &link.short_name).await;
    assert!(matches!(
        result,
        RedirectResult::Redirect { ref location, .. } if location == "https://example.org/page"
    ));

    let event = clicks.try_recv().unwrap();
    recorder.record(event).await.unwrap();

    let rows = HistoryRepository::list_for_link(&*store, link.id, HistoryFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].link_id, Some(link.id));
    assert_eq!(rows[0].ip_address.as_deref(), Some("198.51.100.7"));
    assert_eq!(rows[0].country_name, "Unknown");
}

#[tokio::test]
async fn test_create_then_find_by_code_round_trip() {
    let (state, _store, _clicks) = common::create_test_state(16);

    let link = state
        .link_service
        .create(create("https://example.org/landing?ref=mail"))
        .await
        .unwrap();

    let found = state
        .link_service
        .find_by_code(&link.short_name, None)
        .await
        .unwrap();
    assert_eq!(found.id, link.id);
    assert_eq!(found.destination, "https://example.org/landing?ref=mail");
    assert!(state.link_service.is_reachable(&found));

    state
        .link_service
        .update(link.id, LinkPatch::availability(false))
        .await
        .unwrap();
    let disabled = state
        .link_service
        .find_by_code(&link.short_name, None)
        .await
        .unwrap();
    assert!(!state.link_service.is_reachable(&disabled));

    let missing = state.link_service.find_by_code("no-such-code", None).await;
    assert!(matches!(missing, Err(AppError::NotFound { .. })));
}

#[tokio::test]
async fn test_generated_codes_are_unique() {
    let (state, _store, _clicks) = common::create_test_state(1);
    let mut seen = HashSet::new();

    for i in 0..10_000 {
        let link = state
            .link_service
            .create(create(&format!("https://example.com/{}", i)))
            .await
            .unwrap();
        assert_eq!(link.short_name.len(), 7);
        assert!(seen.insert(link.short_name));
    }

    assert_eq!(seen.len(), 10_000);
}

#[tokio::test]
async fn test_exhausted_code_space() {
    let store = Arc::new(MemoryStore::new());
    let (tx, _rx) = mpsc::channel(1);
    let state = AppState::build_with_generator(
        Backends {
            links: store.clone(),
            domains: store.clone(),
            history: store.clone(),
            cache: Arc::new(NullCache::new()),
        },
        tx,
        StateOptions {
            code_length: 1,
            ..common::options()
        },
        Arc::new(RandomCodeGenerator::with_alphabet(b"a").unwrap()),
    );

    let first = state.link_service.create(create("https://example.com/1")).await.unwrap();
    assert_eq!(first.short_name, "a");

    let second = state.link_service.create(create("https://example.com/2")).await;
    assert!(matches!(second, Err(AppError::CodeSpaceExhausted { attempts: 5 })));

    let custom = state
        .link_service
        .create(CreateLink {
            custom_name: Some("still-free".to_string()),
            ..create("https://example.com/3")
        })
        .await;
    assert!(custom.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_custom_name_race() {
    let (state, _store, _clicks) = common::create_test_state(1);

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = state.link_service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create(CreateLink {
                    custom_name: Some("launch".to_string()),
                    ..create(&format!("https://example.com/{}", i))
                })
                .await
        }));
    }

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::DuplicateCode { code }) => {
                assert_eq!(code, "launch");
                duplicates += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 7);
}

#[tokio::test]
async fn test_domain_disable_hides_only_its_links() {
    let (state, _store, _clicks) = common::create_test_state(64);
    let promo = state.domain_service.create_domain("promo.example.com").await.unwrap();
    let docs = state.domain_service.create_domain("docs.example.com").await.unwrap();

    let on_promo = state
        .link_service
        .create(CreateLink {
            domain_id: Some(promo.id),
            ..create("https://example.com/promo")
        })
        .await
        .unwrap();
    let on_docs = state
        .link_service
        .create(CreateLink {
            domain_id: Some(docs.id),
            ..create("https://example.com/docs")
        })
        .await
        .unwrap();
    let unbound = state.link_service.create(create("https://example.com")).await.unwrap();

    state.domain_service.set_available(promo.id, false).await.unwrap();

    assert_eq!(
        visit(&state, "promo.example.com", &on_promo.short_name).await,
        RedirectResult::NotFound
    );
    assert_eq!(
        visit(&state, "sho.rt", &on_promo.short_name).await,
        RedirectResult::NotFound
    );
    assert!(matches!(
        visit(&state, "docs.example.com", &on_docs.short_name).await,
        RedirectResult::Redirect { .. }
    ));
    assert!(matches!(
        visit(&state, "sho.rt", &unbound.short_name).await,
        RedirectResult::Redirect { .. }
    ));

    let link = state.link_service.find(on_promo.id).await.unwrap();
    assert!(link.available);
    assert!(!link.is_reachable());

    state.domain_service.set_available(promo.id, true).await.unwrap();
    assert!(matches!(
        visit(&state, "promo.example.com", &on_promo.short_name).await,
        RedirectResult::Redirect { .. }
    ));
}

#[tokio::test]
async fn test_cached_resolution_invalidated_on_change() {
    let (state, _store, _clicks) =
        common::create_test_state_with_cache(64, Arc::new(MemoryCache::new(3600)));
    let link = state.link_service.create(create("https://example.com/v1")).await.unwrap();

    assert!(matches!(
        visit(&state, "sho.rt", &link.short_name).await,
        RedirectResult::Redirect { ref location, .. } if location == "https://example.com/v1"
    ));

    state
        .link_service
        .update(
            link.id,
            LinkPatch {
                destination: Some("https://example.com/v2".to_string()),
                ..LinkPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        visit(&state, "sho.rt", &link.short_name).await,
        RedirectResult::Redirect { ref location, .. } if location == "https://example.com/v2"
    ));

    state
        .link_service
        .update(link.id, LinkPatch::availability(false))
        .await
        .unwrap();
    assert_eq!(visit(&state, "sho.rt", &link.short_name).await, RedirectResult::NotFound);
}

#[tokio::test]
async fn test_purge_keeps_history_without_link() {
    let (state, store, _clicks) = common::create_test_state(1);
    let recorder = recorder(&store);
    let link = state.link_service.create(create("https://example.com")).await.unwrap();

    let row = recorder
        .record(ClickEvent::new(link.id, None, Some("weird-agent/1.0")))
        .await
        .unwrap();
    assert_eq!(row.browser, "Other");
    assert_eq!(row.os, "Other");

    let live = state.link_service.purge(link.id).await;
    assert!(matches!(live, Err(AppError::Conflict { .. })));

    state.link_service.soft_delete(link.id).await.unwrap();
    let after_delete = HistoryRepository::find_by_id(&*store, row.id).await.unwrap().unwrap();
    assert_eq!(after_delete.link_id, Some(link.id));

    state.link_service.purge(link.id).await.unwrap();

    assert!(LinkRepository::find_by_id(&*store, link.id).await.unwrap().is_none());
    let orphan = HistoryRepository::find_by_id(&*store, row.id).await.unwrap().unwrap();
    assert_eq!(orphan.link_id, None);
}

#[tokio::test]
async fn test_delete_domain_orphan_policies() {
    let (state, _store, _clicks) = common::create_test_state(64);
    let detach = state.domain_service.create_domain("move.example.com").await.unwrap();
    let disable = state.domain_service.create_domain("disable.example.com").await.unwrap();

    let detached = state
        .link_service
        .create(CreateLink {
            domain_id: Some(detach.id),
            ..create("https://example.com/a")
        })
        .await
        .unwrap();
    let disabled = state
        .link_service
        .create(CreateLink {
            domain_id: Some(disable.id),
            ..create("https://example.com/b")
        })
        .await
        .unwrap();

    assert_eq!(
        state.domain_service.delete_domain(detach.id, OrphanPolicy::Reassign).await.unwrap(),
        1
    );
    assert_eq!(
        state.domain_service.delete_domain(disable.id, OrphanPolicy::Disable).await.unwrap(),
        1
    );

    let detached = state.link_service.find(detached.id).await.unwrap();
    assert!(detached.domain.is_none());
    assert!(matches!(
        visit(&state, "sho.rt", &detached.short_name).await,
        RedirectResult::Redirect { .. }
    ));

    let disabled = state.link_service.find(disabled.id).await.unwrap();
    assert!(!disabled.available);
    assert_eq!(visit(&state, "sho.rt", &disabled.short_name).await, RedirectResult::NotFound);
}

#[tokio::test]
async fn test_worker_drains_queue_on_shutdown() {
    let (state, store, clicks) = common::create_test_state(64);
    let link = state.link_service.create(create("https://example.com")).await.unwrap();

    let worker = tokio::spawn(run_click_worker(clicks, Arc::new(recorder(&store)), 4));

    for _ in 0..20 {
        visit(&state, "sho.rt", &link.short_name).await;
    }
    drop(state);

    worker.await.unwrap();

    let rows = HistoryRepository::list_for_link(&*store, link.id, HistoryFilter::new(0, 100))
        .await
        .unwrap();
    assert_eq!(rows.len(), 20);
}

#[tokio::test]
async fn test_patch_rejects_bad_destination() {
    let (state, _store, _clicks) = common::create_test_state(1);
    let link = state.link_service.create(create("https://example.com")).await.unwrap();

    let result = state
        .link_service
        .update(
            link.id,
            LinkPatch {
                destination: Some("javascript:alert(1)".to_string()),
                ..LinkPatch::default()
            },
        )
        .await;

    match result {
        Err(AppError::Validation { details, .. }) => {
            assert!(details.get("reason").is_some(), "details: {details}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}
