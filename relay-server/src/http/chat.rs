//! SSE chat endpoint: routes a request to a backend and streams frames.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};

use relay_core::{Attachment, ChatTurn, backend, resolve_provider};
use relay_models::auth::resolve_api_key;

use crate::AppState;

/// An incoming chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Working project files, path to content. BTreeMap keeps the prompt
    /// serialization deterministic.
    #[serde(default)]
    pub vfs: BTreeMap<String, String>,
    pub model: String,
    #[serde(default)]
    pub model_provider: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Boundary checks the streaming pipeline relies on.
fn validate(request: &ChatRequest) -> Result<(), String> {
    if request.message.trim().is_empty() {
        return Err("message must not be empty".to_string());
    }
    if request.model.trim().is_empty() {
        return Err("model must not be empty".to_string());
    }
    for path in request.vfs.keys() {
        if path.starts_with('/') || path.split('/').any(|part| part == "..") {
            return Err(format!("vfs path must be relative: {path}"));
        }
    }
    for attachment in &request.attachments {
        if BASE64.decode(&attachment.data_base64).is_err() {
            return Err(format!("attachment is not valid base64: {}", attachment.name));
        }
    }
    Ok(())
}

/// POST /api/chat - stream a normalized frame sequence from the routed
/// backend.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    if let Err(reason) = validate(&request) {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"error": reason}))));
    }

    let kind = resolve_provider(&request.model, request.model_provider.as_deref());
    let backend_impl = state.backend_for(kind);
    tracing::debug!(model = %request.model, backend = backend_impl.name(), "routing chat request");

    let system_prompt = backend::build_system_prompt(&request.vfs, request.system_prompt.as_deref());
    let api_key = resolve_api_key(request.api_key.as_deref());
    let turn = ChatTurn {
        model: request.model,
        system_prompt,
        message: request.message,
        attachments: request.attachments,
        api_key: api_key.map(|k| k.expose_secret().to_string()),
    };

    let frames = backend_impl.stream(turn).await;
    let events =
        frames.map(|frame| Ok::<_, Infallible>(Event::default().data(frame.into_sse_payload())));

    Ok(Sse::new(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str, model: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            vfs: BTreeMap::new(),
            model: model.to_string(),
            model_provider: None,
            api_key: None,
            system_prompt: None,
            attachments: vec![],
        }
    }

    #[test]
    fn validate_rejects_blank_message_and_model() {
        assert!(validate(&request("  ", "gpt-5.2")).is_err());
        assert!(validate(&request("hi", "")).is_err());
        assert!(validate(&request("hi", "gpt-5.2")).is_ok());
    }

    #[test]
    fn validate_rejects_non_relative_vfs_paths() {
        let mut req = request("hi", "gpt-5.2");
        req.vfs.insert("/etc/passwd".to_string(), String::new());
        assert!(validate(&req).is_err());

        let mut req = request("hi", "gpt-5.2");
        req.vfs.insert("src/../../x".to_string(), String::new());
        assert!(validate(&req).is_err());

        let mut req = request("hi", "gpt-5.2");
        req.vfs.insert("src/index.html".to_string(), String::new());
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn validate_rejects_invalid_base64_attachments() {
        let mut req = request("hi", "gpt-5.2");
        req.attachments.push(Attachment {
            name: "broken.bin".to_string(),
            mime_type: "application/octet-stream".to_string(),
            data_base64: "!!!not-base64!!!".to_string(),
        });
        assert!(validate(&req).is_err());

        let mut req = request("hi", "gpt-5.2");
        req.attachments.push(Attachment {
            name: "ok.txt".to_string(),
            mime_type: "text/plain".to_string(),
            data_base64: "aGVsbG8=".to_string(),
        });
        assert!(validate(&req).is_ok());
    }
}
