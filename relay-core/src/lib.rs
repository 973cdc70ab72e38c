//! relay-core: core library for the relay AI gateway
//!
//! This crate provides the foundational components for relay:
//!
//! - **Streaming backends** - [`ChatBackend`] implementations bridging the
//!   OpenRouter HTTP API and the codex CLI subprocess into one frame
//!   protocol
//! - **Provider routing** - [`resolve_provider`] for backend selection
//! - **Device auth** - [`DeviceAuth`] state machine automating the codex
//!   CLI's interactive pairing flow
//! - **CLI driving** - [`CodexCli`] bounded subprocess runner
//! - **Output sanitizing** - [`sanitize::sanitize`] for terminal control
//!   sequence removal
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 resolve_provider                  │
//! │       ┌───────────────┐   ┌───────────────┐      │
//! │       │ OpenRouter    │   │ Codex         │      │
//! │       │ Backend (SSE) │   │ Backend (CLI) │      │
//! │       └───────┬───────┘   └───────┬───────┘      │
//! │               └───── Frame ───────┘              │
//! └──────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!          lazy, cancellable FrameStream
//! ```

pub mod auth;
pub mod backend;
pub mod codex;
pub mod error;
pub mod frame;
pub mod sanitize;

// Re-export key types for convenience
pub use auth::{AuthConfig, AuthSnapshot, DeviceAuth, StartOutcome, VERIFICATION_URL};
pub use backend::{
    Attachment, ChatBackend, ChatTurn, CodexBackend, OpenRouterBackend, OpenRouterConfig,
    ProviderKind, resolve_provider,
};
pub use codex::{CliCapture, CodexCli, CodexConfig};
pub use error::CliError;
pub use frame::{DONE_MARKER, Frame, FrameStream};
