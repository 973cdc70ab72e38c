//! Streaming chat backend for the OpenRouter chat-completions API.
//!
//! A producer task owns the HTTP response and forwards each upstream SSE
//! `data:` payload through a bounded channel; the consumer side is handed
//! back as a [`FrameStream`]. When the consumer goes away the next send
//! fails and the task drops the response, aborting the transfer.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::prompt;
use super::traits::{ChatBackend, ChatTurn};
use crate::frame::{DONE_MARKER, Frame, FrameStream};
use crate::sanitize::truncate_for_display;

/// How much of an upstream error body to forward.
const ERROR_BODY_LIMIT: usize = 2000;

/// Configuration for the OpenRouter backend.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API base (default `https://openrouter.ai/api/v1`, overridable via
    /// `OPENROUTER_BASE_URL`)
    pub base_url: String,
    /// Referer header sent with every request (`OPENROUTER_REFERER`)
    pub referer: String,
    /// Application title header (`OPENROUTER_APP_TITLE`)
    pub app_title: String,
    /// Bound on the whole streaming request
    pub request_timeout: Duration,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            referer: std::env::var("OPENROUTER_REFERER")
                .unwrap_or_else(|_| "https://universal-ai-ide.local".to_string()),
            app_title: std::env::var("OPENROUTER_APP_TITLE")
                .unwrap_or_else(|_| "Universal AI IDE".to_string()),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Backend that bridges a chunked chat-completions response into frames.
pub struct OpenRouterBackend {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterBackend {
    pub fn new(config: OpenRouterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

impl Default for OpenRouterBackend {
    fn default() -> Self {
        Self::new(OpenRouterConfig::default())
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn stream(&self, turn: ChatTurn) -> FrameStream {
        let (tx, rx) = mpsc::channel(32);
        let client = self.client.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            produce(client, config, turn, tx).await;
        });

        ReceiverStream::new(rx)
    }
}

async fn produce(
    client: reqwest::Client,
    config: OpenRouterConfig,
    turn: ChatTurn,
    tx: mpsc::Sender<Frame>,
) {
    let api_key = turn.api_key.clone().filter(|k| !k.trim().is_empty());
    let Some(api_key) = api_key else {
        // No credential, no network call.
        let frame =
            Frame::error("Missing OpenRouter API key. Add it in Settings or set OPENROUTER_API_KEY.");
        let _ = tx.send(frame).await;
        let _ = tx.send(Frame::Done).await;
        return;
    };

    if let Err(frame) = stream_completion(&client, &config, &turn, &api_key, &tx).await {
        if tx.send(frame).await.is_err() {
            return;
        }
    }
    let _ = tx.send(Frame::Done).await;
}

/// Run the upstream request and forward its SSE lines. Returns the error
/// frame to emit, if any; an `Ok` return also covers consumer disconnects,
/// where emitting anything further is pointless.
async fn stream_completion(
    client: &reqwest::Client,
    config: &OpenRouterConfig,
    turn: &ChatTurn,
    api_key: &str,
    tx: &mpsc::Sender<Frame>,
) -> Result<(), Frame> {
    let body = json!({
        "model": turn.model,
        "messages": [
            {"role": "system", "content": turn.system_prompt},
            {"role": "user", "content": prompt::build_user_content(&turn.message, &turn.attachments)},
        ],
        "stream": true,
    });

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    tracing::debug!(model = %turn.model, %url, "opening chat-completions stream");

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .header("HTTP-Referer", &config.referer)
        .header("X-Title", &config.app_title)
        .json(&body)
        .send()
        .await
        .map_err(|e| Frame::error(format!("OpenRouter request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Frame::error_with_detail(
            format!("OpenRouter returned {status}"),
            truncate_for_display(&body, ERROR_BODY_LIMIT),
        ));
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| Frame::error(format!("OpenRouter stream failed: {e}")))?;
        buffer.extend_from_slice(&bytes);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(&buffer[..newline]).trim().to_string();
            buffer.drain(..=newline);

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            // The terminal sentinel is ours to emit, exactly once.
            if payload.is_empty() || payload == DONE_MARKER {
                continue;
            }
            if tx.send(Frame::Content(payload.to_string())).await.is_err() {
                tracing::debug!("chat consumer disconnected, dropping upstream stream");
                return Ok(());
            }
        }
    }

    Ok(())
}
