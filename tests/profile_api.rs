//! Integration tests for the portfolio side: profile CRUD with shared-token
//! auth, admin login, health checks, API 404s and the SPA fallback.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};

use portfolio_server::AppState;
use portfolio_server::config::AppConfig;
use portfolio_server::llm::{ChatRelay, ModelGateway, PromptSet};
use portfolio_server::profile::ProfileStore;
use portfolio_server::security::SimpleRateLimiter;
use portfolio_server::server::build_router;

fn test_server(dir: &std::path::Path) -> TestServer {
    let profile_path = dir.join("data/profile.json");
    let config = AppConfig::load_from_args([
        "portfolio-server",
        "--rate-limit-enabled",
        "false",
        "--admin-token",
        "test-admin-token",
        "--admin-password",
        "hunter2",
        "--profile-path",
        profile_path.to_str().unwrap(),
    ])
    .unwrap();

    let gateway = Arc::new(ModelGateway::new(vec![], PromptSet::from_entries([])));
    let state = AppState {
        relay: Arc::new(ChatRelay::new(Arc::clone(&gateway), false)),
        gateway,
        profiles: ProfileStore::new(&config.server.profile_path),
        rate_limiter: Arc::new(SimpleRateLimiter::new(5.0, 10.0)),
        config: Arc::new(config),
    };

    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn profile_get_returns_default_document() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let res = server.get("/api/profile").await;
    res.assert_status_ok();

    let body: Value = res.json();
    assert_eq!(body["full_name"], "Your Name");
    assert!(body["experience"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn profile_put_requires_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let res = server
        .put("/api/profile")
        .json(&json!({ "full_name": "Mallory" }))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);

    let res = server
        .put("/api/profile")
        .authorization_bearer("wrong-token")
        .json(&json!({ "full_name": "Mallory" }))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);

    // Unchanged
    let body: Value = server.get("/api/profile").await.json();
    assert_eq!(body["full_name"], "Your Name");
}

#[tokio::test]
async fn profile_put_roundtrip_with_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let doc = json!({
        "full_name": "Ada Lovelace",
        "headline": "Engineer",
        "skills": ["Rust", "Mathematics"]
    });

    let res = server
        .put("/api/profile")
        .authorization_bearer("test-admin-token")
        .json(&doc)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>(), doc);

    let body: Value = server.get("/api/profile").await.json();
    assert_eq!(body, doc);
}

#[tokio::test]
async fn admin_login_exchanges_password_for_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let res = server
        .post("/api/admin/login")
        .json(&json!({ "password": "hunter2" }))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["token"], "test-admin-token");

    let res = server
        .post("/api/admin/login")
        .json(&json!({ "password": "wrong" }))
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>()["error"], "Invalid password");
}

#[tokio::test]
async fn health_reports_profile_file_state() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let body: Value = server.get("/api/health").await.json();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["service"], "portfolio-server");
    assert_eq!(body["profileFileExists"], false);

    server
        .put("/api/profile")
        .authorization_bearer("test-admin-token")
        .json(&json!({ "full_name": "Ada" }))
        .await
        .assert_status_ok();

    let body: Value = server.get("/api/health").await.json();
    assert_eq!(body["profileFileExists"], true);

    // Compatibility endpoint
    let body: Value = server.get("/health").await.json();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn unknown_api_routes_get_json_404() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    let res = server.get("/api/does/not/exist").await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>()["error"], "API endpoint not found");
}

#[tokio::test]
async fn client_routes_fall_back_to_the_spa_shell() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path());

    // An asset that exists is served directly
    let res = server.get("/index.html").await;
    res.assert_status_ok();
    assert!(res.text().contains("<html"));

    // A client-side route falls back to the shell
    let res = server.get("/chat").await;
    res.assert_status_ok();
    assert!(res.text().contains("<html"));
}
