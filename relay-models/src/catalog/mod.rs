//! The merged model catalog offered to clients.
//!
//! A curated static list anchors the catalog; dynamically fetched entries
//! are folded in behind a keyword filter. Merging is idempotent and
//! order-stable: curated entries come first and are never overwritten.

use std::collections::HashSet;

use crate::ModelEntry;

/// Curated models, in the order they are presented.
const CURATED_MODELS: &[(&str, &str)] = &[
    ("openai/gpt-5.2", "GPT-5.2"),
    ("openai/gpt-5.3", "GPT-5.3"),
    ("anthropic/claude-sonnet-4.5", "Claude Sonnet 4.5"),
    ("google/gemini-3-pro", "Gemini 3 Pro"),
    ("qwen/qwen3-coder", "Qwen3 Coder"),
    ("gpt-5.2-codex", "GPT-5.2 Codex"),
    ("gpt-5.3-codex", "GPT-5.3 Codex"),
];

/// Models served by the codex CLI backend.
const CODEX_MODELS: &[(&str, &str)] = &[
    ("gpt-5.2-codex", "GPT-5.2 Codex"),
    ("gpt-5.3-codex", "GPT-5.3 Codex"),
    ("gpt-5.3", "GPT-5.3"),
    ("codex-mini-latest", "Codex Mini"),
];

/// A dynamic entry joins the catalog only when its id contains one of
/// these substrings.
const MERGE_KEYWORDS: &[&str] = &[
    "gpt", "claude", "gemini", "qwen", "llama", "deepseek", "mistral",
];

/// The curated catalog, in presentation order.
pub fn curated() -> Vec<ModelEntry> {
    CURATED_MODELS
        .iter()
        .map(|(id, name)| ModelEntry::new(*id, *name))
        .collect()
}

/// The catalog of CLI-served models.
pub fn codex_models() -> Vec<ModelEntry> {
    CODEX_MODELS
        .iter()
        .map(|(id, name)| ModelEntry::new(*id, *name))
        .collect()
}

/// Merge dynamically fetched entries into the curated catalog.
///
/// Curated entries keep their position and labels; a dynamic entry is
/// appended when its id matches a merge keyword and has not been seen yet,
/// with a label derived from the id when the upstream one is blank.
pub fn merge(dynamic: &[ModelEntry]) -> Vec<ModelEntry> {
    let mut merged = curated();
    let mut seen: HashSet<String> = merged.iter().map(|m| m.id.clone()).collect();

    for entry in dynamic {
        let id_lower = entry.id.to_lowercase();
        if !MERGE_KEYWORDS.iter().any(|k| id_lower.contains(k)) {
            continue;
        }
        if !seen.insert(entry.id.clone()) {
            continue;
        }
        let name = if entry.name.trim().is_empty() {
            derive_label(&entry.id)
        } else {
            entry.name.clone()
        };
        merged.push(ModelEntry {
            id: entry.id.clone(),
            name,
            context_length: entry.context_length,
        });
    }

    merged
}

/// Derive a human label from a model id: namespace stripped, separators
/// replaced with spaces, words title-cased.
pub fn derive_label(id: &str) -> String {
    let base = id.split_once('/').map(|(_, rest)| rest).unwrap_or(id);
    base.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
