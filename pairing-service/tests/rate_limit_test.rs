//! Per-IP limits on the poll route.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_poll_is_limited_per_ip() {
    let app = TestApp::spawn();
    let code = app.generate_code().await;
    let body = json!({ "code": code });

    for attempt in 0..10 {
        let (status, _) = app
            .post_from("/api/poll-tv-code", body.clone(), None, "198.51.100.7")
            .await;
        assert_eq!(status, StatusCode::OK, "attempt {} was limited", attempt);
    }

    let (status, body_json) = app
        .post_from("/api/poll-tv-code", body.clone(), None, "198.51.100.7")
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body_json["error"].is_string());

    // Another TV on another address is unaffected
    let (status, _) = app
        .post_from("/api/poll-tv-code", body, None, "198.51.100.8")
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_poll_limit_is_configurable() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.poll_attempts = 2;
    });
    let body = json!({ "code": "000000" });

    for _ in 0..2 {
        let (status, _) = app
            .post_from("/api/poll-tv-code", body.clone(), None, "198.51.100.9")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = app
        .post_from("/api/poll-tv-code", body, None, "198.51.100.9")
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_other_routes_use_global_limit() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.poll_attempts = 1;
    });

    // Generation is only under the global limit of 100
    for _ in 0..5 {
        let (status, _) = app
            .post_from(
                "/api/generate-tv-code",
                json!({ "email": common::TEST_EMAIL }),
                None,
                "198.51.100.10",
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
