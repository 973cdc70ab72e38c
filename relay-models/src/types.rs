//! Core types for model management.

use serde::{Deserialize, Serialize};

/// One entry of a model catalog.
///
/// `id` is the routing identifier (possibly namespaced, like
/// `openai/gpt-5.2`); `name` is the human label shown in pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
}

impl ModelEntry {
    /// Create an entry without a known context length.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            context_length: None,
        }
    }

    /// Attach a context length.
    pub fn with_context_length(mut self, context_length: u64) -> Self {
        self.context_length = Some(context_length);
        self
    }
}
