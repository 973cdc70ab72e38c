//! HTTP server module

mod api;
mod chat;
mod device_auth;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub use api::{HealthResponse, ModelListResponse, RecommendRequest};
pub use chat::ChatRequest;
pub use device_auth::DisconnectResponse;

/// Create the HTTP router with all routes configured.
///
/// CORS is wide open, matching the gateway's role as a local backend for a
/// browser IDE; deployment-grade tightening happens in front of it.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/models/recommend", post(api::recommend_models))
        .route("/api/models/:provider", get(api::list_models))
        .route(
            "/api/codex/device-auth/start",
            get(device_auth::start).post(device_auth::start),
        )
        .route("/api/codex/status", get(device_auth::status))
        .route("/api/codex/disconnect", post(device_auth::disconnect))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
