//! Shared application state for the relay server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_core::{ChatBackend, CodexBackend, DeviceAuth, OpenRouterBackend, ProviderKind};
use relay_models::providers::OpenRouterProvider;

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Device-auth state machine for the codex CLI
    pub device_auth: Arc<DeviceAuth>,
    /// TTL-cached remote model-list provider
    pub model_provider: Arc<OpenRouterProvider>,
    /// HTTP chat backend
    pub openrouter_backend: Arc<OpenRouterBackend>,
    /// CLI chat backend
    pub codex_backend: Arc<CodexBackend>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState with default (environment-driven) components
    pub fn new() -> Self {
        Self::with_components(
            Arc::new(DeviceAuth::default()),
            Arc::new(OpenRouterProvider::default()),
            Arc::new(OpenRouterBackend::default()),
            Arc::new(CodexBackend::default()),
        )
    }

    /// Create AppState with custom components (for testing)
    pub fn with_components(
        device_auth: Arc<DeviceAuth>,
        model_provider: Arc<OpenRouterProvider>,
        openrouter_backend: Arc<OpenRouterBackend>,
        codex_backend: Arc<CodexBackend>,
    ) -> Self {
        Self {
            device_auth,
            model_provider,
            openrouter_backend,
            codex_backend,
            started_at: Utc::now(),
        }
    }

    /// The chat backend serving `kind`.
    pub fn backend_for(&self, kind: ProviderKind) -> Arc<dyn ChatBackend> {
        match kind {
            ProviderKind::OpenRouter => self.openrouter_backend.clone(),
            ProviderKind::Codex => self.codex_backend.clone(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_new_has_nonnegative_uptime() {
        let state = AppState::new();
        assert!(state.uptime_seconds() >= 0);
    }

    #[test]
    fn backend_for_picks_by_provider_kind() {
        let state = AppState::new();
        assert_eq!(state.backend_for(ProviderKind::OpenRouter).name(), "openrouter");
        assert_eq!(state.backend_for(ProviderKind::Codex).name(), "codex");
    }
}
