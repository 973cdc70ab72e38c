//! ChatBackend trait and the request shape handed to backends.
//!
//! The backend abstraction keeps transport branching out of request
//! handlers: both the HTTP and the subprocess transport implement the same
//! "produce a lazy, cancellable sequence of frames" contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::FrameStream;

/// An attachment forwarded with a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data_base64: String,
}

impl Attachment {
    /// Whether this attachment is an image the HTTP backend can inline.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A fully resolved chat turn: everything a backend needs to produce frames.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub model: String,
    pub system_prompt: String,
    pub message: String,
    pub attachments: Vec<Attachment>,
    /// Resolved credential (request key or environment fallback); `None`
    /// means the caller had nothing to offer.
    pub api_key: Option<String>,
}

/// A source of response frames for one chat turn.
///
/// Implementations own their transport and never return errors from
/// `stream`: every failure becomes an `Error` frame, and each produced
/// stream ends with exactly one `Done`. Dropping the returned stream
/// cancels the turn; the producer observes the closed channel and releases
/// its transport (kills the subprocess, drops the HTTP response).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Open the transport and produce the frame stream for one turn.
    async fn stream(&self, turn: ChatTurn) -> FrameStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_attachments_are_recognized_by_mime_type() {
        let image = Attachment {
            name: "shot.png".to_string(),
            mime_type: "image/png".to_string(),
            data_base64: "aGk=".to_string(),
        };
        let text = Attachment {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            data_base64: "aGk=".to_string(),
        };
        assert!(image.is_image());
        assert!(!text.is_image());
    }
}
