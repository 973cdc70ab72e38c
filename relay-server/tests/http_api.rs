//! End-to-end tests over the full router: protocol shape, routing, and
//! device-auth endpoints, with the codex CLI stubbed out.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{Value, json};

use relay_core::{
    AuthConfig, CodexBackend, CodexCli, CodexConfig, DeviceAuth, OpenRouterBackend,
    OpenRouterConfig,
};
use relay_models::providers::{OpenRouterProvider, OpenRouterProviderConfig};
use relay_server::{AppState, create_router};

/// A server whose codex binary does not exist and whose OpenRouter base URL
/// refuses connections.
fn offline_server() -> TestServer {
    let cli = CodexCli::new(CodexConfig::with_program("relay-test-no-such-binary"));
    let state = AppState::with_components(
        Arc::new(DeviceAuth::new(cli.clone(), AuthConfig::default())),
        Arc::new(OpenRouterProvider::new(OpenRouterProviderConfig {
            base_url: "http://127.0.0.1:9/api/v1".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..OpenRouterProviderConfig::default()
        })),
        Arc::new(OpenRouterBackend::new(OpenRouterConfig {
            base_url: "http://127.0.0.1:9/api/v1".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..OpenRouterConfig::default()
        })),
        Arc::new(CodexBackend::new(cli)),
    );
    TestServer::new(create_router(Arc::new(state))).expect("test server")
}

/// A server whose codex CLI is an `echo` stub producing `output`.
fn stubbed_codex_server(output: &str) -> TestServer {
    let cli = CodexCli::new(CodexConfig::with_command(
        "echo".to_string(),
        vec![output.to_string()],
    ));
    let state = AppState::with_components(
        Arc::new(DeviceAuth::new(cli.clone(), AuthConfig::default())),
        Arc::new(OpenRouterProvider::default()),
        Arc::new(OpenRouterBackend::default()),
        Arc::new(CodexBackend::new(cli)),
    );
    TestServer::new(create_router(Arc::new(state))).expect("test server")
}

#[tokio::test]
async fn health_reports_ok() {
    let server = offline_server();
    let response = server.get("/api/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn chat_stream_always_terminates_with_done_sentinel() {
    let server = offline_server();

    let response = server
        .post("/api/chat")
        .json(&json!({
            "message": "hello",
            "vfs": {},
            "model": "openai/gpt-5.2",
            "api_key": "sk-test",
        }))
        .await;
    response.assert_status_ok();

    let body = response.text();
    // The unreachable upstream produced exactly one error frame, then the
    // terminal sentinel.
    assert!(body.contains("\"error\""));
    assert!(body.ends_with("data: [DONE]\n\n"));
    assert_eq!(body.matches("data: [DONE]").count(), 1);
}

#[tokio::test]
async fn chat_routes_cli_only_model_to_codex_backend() {
    let server = offline_server();

    // The hint says openrouter; the identifier wins and the codex backend
    // reports its missing binary.
    let response = server
        .post("/api/chat")
        .json(&json!({
            "message": "hello",
            "vfs": {},
            "model": "openai/gpt-5.3",
            "model_provider": "openrouter",
            "api_key": "sk-test",
        }))
        .await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("Codex CLI is not installed"));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn chat_rejects_empty_message() {
    let server = offline_server();

    let response = server
        .post("/api/chat")
        .json(&json!({
            "message": "   ",
            "vfs": {},
            "model": "openai/gpt-5.2",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn codex_status_reports_unauthenticated_shape() {
    let server = offline_server();

    let response = server.get("/api/codex/status").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
    assert!(body["message"].is_string());
    assert!(
        body["verification_url"]
            .as_str()
            .unwrap()
            .starts_with("https://")
    );
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn device_auth_start_returns_429_under_rate_limit() {
    let server = stubbed_codex_server("Error: 429 Too Many Requests from upstream");

    let response = server.post("/api/codex/device-auth/start").await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);

    let body: Value = response.json();
    assert!(body["retry_after_seconds"].as_u64().unwrap() >= 1);

    // The cooldown now guards every further start.
    let again = server.get("/api/codex/device-auth/start").await;
    again.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn device_auth_start_surfaces_pairing_code() {
    let server =
        stubbed_codex_server("enter YIR7-K2M4P at https://auth.openai.com/codex/device please");

    let response = server.post("/api/codex/device-auth/start").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["code"], "YIR7-K2M4P");
    assert_eq!(body["verification_url"], "https://auth.openai.com/codex/device");

    // The code is visible through status as well.
    let status: Value = server.get("/api/codex/status").await.json();
    assert_eq!(status["code"], "YIR7-K2M4P");
}

#[tokio::test]
async fn disconnect_resets_to_disconnected() {
    let server = offline_server();

    let response = server.post("/api/codex/disconnect").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Disconnected");
}

#[tokio::test]
async fn models_endpoint_rejects_unknown_provider() {
    let server = offline_server();
    let response = server.get("/api/models/huggingface").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recommend_endpoint_round_trips() {
    let server = offline_server();

    let response = server
        .post("/api/models/recommend")
        .json(&json!({
            "message": "fix this typescript bug",
            "candidates": ["gpt-5.2", "gemini-3-flash", "llama-4"],
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["recommended"], "gpt-5.2");
}
