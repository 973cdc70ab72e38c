//! Device-auth endpoints for the codex CLI.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use relay_core::AuthSnapshot;

use crate::AppState;

/// Response for the disconnect endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub ok: bool,
    pub message: String,
}

/// GET /api/codex/status - current auth state, reconciled with the CLI
pub async fn status(State(state): State<Arc<AppState>>) -> Json<AuthSnapshot> {
    Json(state.device_auth.status().await)
}

/// GET|POST /api/codex/device-auth/start - begin or resume pairing.
///
/// A cooldown (local throttle or upstream rate limit) comes back as 429
/// with `retry_after_seconds`.
pub async fn start(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state.device_auth.start().await;
    if outcome.retry_after_seconds.is_some() {
        (StatusCode::TOO_MANY_REQUESTS, Json(outcome)).into_response()
    } else {
        Json(outcome).into_response()
    }
}

/// POST /api/codex/disconnect - logout and reset local state
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<DisconnectResponse> {
    let snapshot = state.device_auth.disconnect().await;
    Json(DisconnectResponse {
        ok: true,
        message: snapshot.message,
    })
}
