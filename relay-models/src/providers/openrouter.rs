//! OpenRouter model-list provider.
//!
//! Fetches the hosted model list and keeps it in an in-process TTL cache so
//! bursts of catalog requests cost one upstream call. A failed refresh never
//! clobbers a previously cached list.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::auth::ApiKey;
use crate::{Error, ModelEntry, Result};

/// Response from OpenRouter's `/models` endpoint.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<RemoteModel>,
}

/// Model information as OpenRouter reports it.
#[derive(Debug, Deserialize)]
struct RemoteModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
}

impl RemoteModel {
    fn into_entry(self) -> ModelEntry {
        ModelEntry {
            name: self.name.unwrap_or_default(),
            id: self.id,
            context_length: self.context_length,
        }
    }
}

struct CachedList {
    fetched_at: Instant,
    models: Vec<ModelEntry>,
}

/// Configuration for the OpenRouter model-list provider.
#[derive(Debug, Clone)]
pub struct OpenRouterProviderConfig {
    /// API base (default `https://openrouter.ai/api/v1`, overridable via
    /// `OPENROUTER_BASE_URL`)
    pub base_url: String,
    /// Referer header (`OPENROUTER_REFERER`)
    pub referer: String,
    /// Application title header (`OPENROUTER_APP_TITLE`)
    pub app_title: String,
    /// How long a fetched list stays fresh
    /// (`RELAY_MODEL_CACHE_TTL_SECS`, default 300)
    pub cache_ttl: Duration,
    /// Bound on the list request
    pub request_timeout: Duration,
}

impl Default for OpenRouterProviderConfig {
    fn default() -> Self {
        let ttl_secs = std::env::var("RELAY_MODEL_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Self {
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            referer: std::env::var("OPENROUTER_REFERER")
                .unwrap_or_else(|_| "https://universal-ai-ide.local".to_string()),
            app_title: std::env::var("OPENROUTER_APP_TITLE")
                .unwrap_or_else(|_| "Universal AI IDE".to_string()),
            cache_ttl: Duration::from_secs(ttl_secs),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// OpenRouter model-list provider with a TTL cache.
pub struct OpenRouterProvider {
    config: OpenRouterProviderConfig,
    client: reqwest::Client,
    cached: RwLock<Option<CachedList>>,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            cached: RwLock::new(None),
        }
    }

    /// Fetch the remote model list, served from cache within the TTL.
    ///
    /// Concurrent callers may race past an expired cache and fetch twice;
    /// both writes are complete lists, so the cache never holds torn data.
    pub async fn fetch(&self, api_key: &ApiKey) -> Result<Vec<ModelEntry>> {
        if let Some(models) = self.cached_models() {
            tracing::debug!(count = models.len(), "serving model list from cache");
            return Ok(models);
        }

        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key.expose_secret())
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.app_title)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            // Leave any previous cache untouched.
            return Err(Error::ProviderApi(format!(
                "OpenRouter models request failed ({})",
                response.status().as_u16()
            )));
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;
        let models: Vec<ModelEntry> = parsed.data.into_iter().map(RemoteModel::into_entry).collect();

        *self.cached.write().unwrap() = Some(CachedList {
            fetched_at: Instant::now(),
            models: models.clone(),
        });
        tracing::debug!(count = models.len(), "refreshed model list from OpenRouter");

        Ok(models)
    }

    /// The cached list, when present and fresh.
    fn cached_models(&self) -> Option<Vec<ModelEntry>> {
        let cached = self.cached.read().unwrap();
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.config.cache_ttl)
            .map(|c| c.models.clone())
    }

    /// Seed the cache directly (for testing).
    #[cfg(test)]
    fn set_cached(&self, models: Vec<ModelEntry>, fetched_at: Instant) {
        *self.cached.write().unwrap() = Some(CachedList { fetched_at, models });
    }
}

impl Default for OpenRouterProvider {
    fn default() -> Self {
        Self::new(OpenRouterProviderConfig::default())
    }
}
