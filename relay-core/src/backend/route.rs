//! Backend selection for an incoming chat request.

/// Which transport a chat turn should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Remote chat-completions API over HTTP
    OpenRouter,
    /// Local codex CLI subprocess
    Codex,
}

/// Models only the codex CLI can serve, keyed without namespace prefix.
const CODEX_ONLY_MODELS: &[&str] = &[
    "gpt-5.3",
    "gpt-5.2-codex",
    "gpt-5.3-codex",
    "codex-mini-latest",
];

/// Strip a `namespace/` prefix from a model identifier.
fn base_model(id: &str) -> &str {
    id.split_once('/').map(|(_, rest)| rest).unwrap_or(id)
}

/// Pick the backend for `model` and an optional caller-supplied hint.
///
/// The identifier wins over the hint: a stale client sending a CLI-only
/// model with an HTTP hint would otherwise fail upstream.
pub fn resolve_provider(model: &str, provider_hint: Option<&str>) -> ProviderKind {
    let base = base_model(model.trim()).to_lowercase();
    if CODEX_ONLY_MODELS.contains(&base.as_str()) {
        return ProviderKind::Codex;
    }

    match provider_hint.map(|h| h.trim().to_lowercase()) {
        Some(hint) if hint == "codex" => ProviderKind::Codex,
        _ => ProviderKind::OpenRouter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_only_identifier_overrides_http_hint() {
        assert_eq!(
            resolve_provider("openai/gpt-5.3", Some("openrouter")),
            ProviderKind::Codex
        );
        assert_eq!(
            resolve_provider("gpt-5.2-codex", Some("openrouter")),
            ProviderKind::Codex
        );
    }

    #[test]
    fn codex_hint_routes_to_cli_backend() {
        assert_eq!(
            resolve_provider("some/other-model", Some("codex")),
            ProviderKind::Codex
        );
        assert_eq!(
            resolve_provider("some/other-model", Some("  CODEX  ")),
            ProviderKind::Codex
        );
    }

    #[test]
    fn default_and_http_hints_route_to_http_backend() {
        assert_eq!(
            resolve_provider("openai/gpt-5.2", None),
            ProviderKind::OpenRouter
        );
        assert_eq!(
            resolve_provider("openai/gpt-5.2", Some("openrouter")),
            ProviderKind::OpenRouter
        );
        assert_eq!(
            resolve_provider("meta-llama/llama-4", Some("unknown-provider")),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn namespace_prefix_is_ignored_for_identifier_match() {
        assert_eq!(resolve_provider("GPT-5.3", None), ProviderKind::Codex);
        assert_eq!(
            resolve_provider("anything/codex-mini-latest", None),
            ProviderKind::Codex
        );
    }
}
