//! REST API handlers: health, model catalog, recommendation

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use relay_models::auth::resolve_api_key;
use relay_models::{ModelEntry, catalog, recommend};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Query parameters for the model list endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Response for listing models
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelEntry>,
}

/// GET /api/models/:provider - the catalog offered for one backend
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    match provider.as_str() {
        "codex" => Json(ModelListResponse {
            models: catalog::codex_models(),
        })
        .into_response(),

        "openrouter" => {
            let Some(api_key) = resolve_api_key(query.api_key.as_deref()) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Missing OpenRouter API key. Pass api_key or set OPENROUTER_API_KEY.",
                        "models": [],
                    })),
                )
                    .into_response();
            };

            match state.model_provider.fetch(&api_key).await {
                Ok(remote) => Json(ModelListResponse {
                    models: catalog::merge(&remote),
                })
                .into_response(),
                Err(e) => {
                    tracing::warn!("model list fetch failed: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        Json(json!({"error": e.to_string(), "models": []})),
                    )
                        .into_response()
                }
            }
        }

        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown provider: {provider}"), "models": []})),
        )
            .into_response(),
    }
}

/// Request body for the recommendation endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub message: String,
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Accepted for parity with the chat request; scoring is local.
    #[serde(default)]
    #[allow(dead_code)]
    pub api_key: Option<String>,
}

/// POST /api/models/recommend - rank candidates against a prompt
pub async fn recommend_models(Json(request): Json<RecommendRequest>) -> Response {
    match recommend::recommend(&request.message, &request.candidates) {
        Ok(recommendation) => Json(recommendation).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
