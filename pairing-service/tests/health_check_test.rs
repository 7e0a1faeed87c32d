//! Health, metrics and API document endpoints.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use pairing_service::{
    config::PairingConfig,
    db,
    services::{CacheStore, Database, RedisService, StoreHealth},
};

#[tokio::test]
async fn test_health_check_reports_backends() {
    let app = TestApp::spawn();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "pairing-service-test");
    assert_eq!(body["checks"]["postgres"], "up");
    assert_eq!(body["checks"]["redis"], "up");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::spawn();
    let (status, body) = app.get("/.well-known/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let paths = &body["paths"];
    for path in [
        "/api/generate-tv-code",
        "/api/poll-tv-code",
        "/api/active-tv-code",
        "/api/login",
        "/api/refresh",
        "/health",
    ] {
        assert!(paths.get(path).is_some(), "{} missing from OpenAPI", path);
    }
}

#[tokio::test]
#[ignore] // Requires PostgreSQL and Redis
async fn test_real_backends_are_healthy() {
    let config = PairingConfig::from_env().expect("Failed to load config");

    let pool = db::create_pool(&config.database)
        .await
        .expect("Failed to connect to Postgres");
    Database::new(pool)
        .health_check()
        .await
        .expect("Postgres unhealthy");

    RedisService::new(&config.redis)
        .await
        .expect("Failed to connect to Redis")
        .health_check()
        .await
        .expect("Redis unhealthy");
}
