mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use std::time::Duration;

use billsense_api::launch;
use common::{spawn_app, test_config};

// ============================================================================
// HEALTH AND ROUTING
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app();

    let (status, body) = app.get("/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "BillSense AI Backend API is running" }));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = spawn_app();

    let (status, body) = app.get("/api/unknown", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_undeclared_method_is_404() {
    let app = spawn_app();

    let (status, _) = app.request(Method::PATCH, "/api/invoices", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete("/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_on_responses() {
    let app = spawn_app();
    let request = axum::http::Request::builder()
        .uri("/")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

// ============================================================================
// STARTUP
// ============================================================================

#[tokio::test]
async fn test_launch_fails_when_database_unreachable() {
    let mut config = test_config(None);
    config.database.acquire_timeout = Duration::from_millis(500);
    config.database.min_connections = 0;

    let result = tokio::time::timeout(Duration::from_secs(30), launch(config))
        .await
        .expect("launch should give up on its own");

    assert!(result.is_err());
}
