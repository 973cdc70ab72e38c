//! Streaming chat backends behind one contract.
//!
//! Two transports implement [`ChatBackend`]: an HTTP bridge to the
//! OpenRouter chat-completions API and a subprocess bridge to the codex
//! CLI. [`resolve_provider`] decides which one serves a given request.

mod codex;
mod openrouter;
mod prompt;
mod route;
mod traits;

pub use codex::CodexBackend;
pub use openrouter::{OpenRouterBackend, OpenRouterConfig};
pub use prompt::{build_system_prompt, build_user_content, compose_cli_prompt};
pub use route::{ProviderKind, resolve_provider};
pub use traits::{Attachment, ChatBackend, ChatTurn};
