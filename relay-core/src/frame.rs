//! Client-facing stream frame protocol.
//!
//! Both backends produce the same lazy sequence of [`Frame`]s regardless of
//! transport. A `Content` frame carries the payload of one `data:` line: the
//! HTTP backend forwards upstream JSON objects verbatim, while the CLI
//! backend wraps sanitized subprocess text via [`Frame::delta`]. Every stream
//! ends with exactly one `Done`, even after an error.

use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

/// Literal payload of the terminal sentinel event.
pub const DONE_MARKER: &str = "[DONE]";

/// One unit of the client-facing streaming protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload for one `data:` line, already JSON-encoded.
    Content(String),
    /// A protocol-level error; the stream still completes with `Done`.
    Error {
        message: String,
        detail: Option<String>,
    },
    /// Terminal sentinel; nothing may follow it.
    Done,
}

impl Frame {
    /// Wrap a plain text delta in the chat-completions chunk shape.
    pub fn delta(text: &str) -> Self {
        Frame::Content(json!({"choices": [{"delta": {"content": text}}]}).to_string())
    }

    /// An error frame without detail.
    pub fn error(message: impl Into<String>) -> Self {
        Frame::Error {
            message: message.into(),
            detail: None,
        }
    }

    /// An error frame carrying upstream detail.
    pub fn error_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Frame::Error {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Serialize to the payload of one SSE `data:` line.
    pub fn into_sse_payload(self) -> String {
        match self {
            Frame::Content(payload) => payload,
            Frame::Error { message, detail } => match detail {
                Some(detail) => json!({"error": message, "detail": detail}).to_string(),
                None => json!({"error": message}).to_string(),
            },
            Frame::Done => DONE_MARKER.to_string(),
        }
    }

    /// Whether this is the terminal sentinel.
    pub fn is_done(&self) -> bool {
        matches!(self, Frame::Done)
    }
}

/// A cancellable, lazily produced sequence of frames.
///
/// Dropping the stream drops the channel receiver; the producing task
/// observes the failed send and releases its transport resources.
pub type FrameStream = ReceiverStream<Frame>;
