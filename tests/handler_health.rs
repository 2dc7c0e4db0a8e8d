mod common;

use axum::http::StatusCode;
use shortlink::api::dto::health::HealthResponse;

#[tokio::test]
async fn test_health_check() {
    let app = common::test_app();

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "healthy");
    assert!(body.checks.store.is_ok());
    assert!(body.checks.click_queue.is_ok());
    assert!(body.checks.cache.is_ok());
}

#[tokio::test]
async fn test_health_trailing_slash() {
    let app = common::test_app();

    let response = app.server.get("/health/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_degraded_when_queue_closed() {
    let common::TestApp { server, clicks, .. } = common::test_app();
    drop(clicks);

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "degraded");
    assert!(body.checks.store.is_ok());
    assert!(!body.checks.click_queue.is_ok());
}
