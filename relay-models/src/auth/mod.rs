//! Credential handling for remote model APIs.
//!
//! Keys arrive with a request or from the environment; either way they are
//! wrapped in [`ApiKey`] so they cannot leak through `Debug` formatting or
//! logs.

use secrecy::{ExposeSecret, SecretString};

/// Environment variable consulted when a request carries no key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString`, which implements `Debug` as
/// `"[REDACTED]"`, zeroizes memory on drop, and requires an explicit
/// `.expose_secret()` to read.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value. Use sparingly, only when actually
    /// sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resolve a usable key: the request-supplied one wins, then the
/// environment fallback. Blank strings count as absent.
pub fn resolve_api_key(request_key: Option<&str>) -> Option<ApiKey> {
    let from_request = request_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ApiKey::from);
    if from_request.is_some() {
        return from_request;
    }

    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .map(ApiKey::new)
}
