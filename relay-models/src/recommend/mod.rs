//! Heuristic model recommendation.
//!
//! Scores candidate model identifiers against a free-text prompt with
//! keyword heuristics, then stable-sorts descending so ties keep the
//! caller's order.

use serde::Serialize;

use crate::{Error, Result};

/// Prompt keywords signalling coding work.
const PROMPT_CODE_KEYWORDS: &[&str] = &[
    "code", "debug", "typescript", "python", "api", "refactor", "bug", "error", "html", "css",
    "js", "fix",
];

/// Prompt keywords signalling reasoning-heavy work.
const PROMPT_REASONING_KEYWORDS: &[&str] =
    &["reason", "math", "analysis", "analyze", "plan", "logic", "prove"];

/// Model-id substrings marking coding-capable models.
const MODEL_CODE_HINTS: &[&str] = &["codex", "gpt-5", "claude", "qwen", "deepseek"];

/// Model-id substrings marking reasoning-capable models.
const MODEL_REASONING_HINTS: &[&str] = &["gpt-5.3", "o3", "r1", "reasoning", "think"];

/// Flagship model-name substrings.
const FLAGSHIP_HINTS: &[&str] = &["gpt-5", "claude", "gemini"];

/// Free-tier and small-model substrings.
const ECONOMY_HINTS: &[&str] = &["mini", "nano", ":free", "lite"];

const CATEGORY_BONUS: i64 = 8;
const FLAGSHIP_BONUS: i64 = 2;
const ECONOMY_PENALTY: i64 = 3;

/// How many ranked ids a recommendation carries.
const RANKED_LIMIT: usize = 3;

/// A scored candidate, in ranking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    pub model_id: String,
    pub score: i64,
}

/// The result of [`recommend`].
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub recommended: String,
    pub ranked: Vec<String>,
    pub reason: String,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Score one model id against a prompt. Case-insensitive throughout.
pub fn score(prompt: &str, model_id: &str) -> i64 {
    let prompt = prompt.to_lowercase();
    let model = model_id.to_lowercase();
    let mut score = 0;

    if contains_any(&prompt, PROMPT_CODE_KEYWORDS) && contains_any(&model, MODEL_CODE_HINTS) {
        score += CATEGORY_BONUS;
    }
    if contains_any(&prompt, PROMPT_REASONING_KEYWORDS)
        && contains_any(&model, MODEL_REASONING_HINTS)
    {
        score += CATEGORY_BONUS;
    }
    if contains_any(&model, FLAGSHIP_HINTS) {
        score += FLAGSHIP_BONUS;
    }
    if contains_any(&model, ECONOMY_HINTS) {
        score -= ECONOMY_PENALTY;
    }

    score
}

/// Rank candidates by descending score; the sort is stable, so ties keep
/// their input order.
pub fn rank(prompt: &str, candidates: &[String]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|id| RankedCandidate {
            model_id: id.clone(),
            score: score(prompt, id),
        })
        .collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(c.score));
    ranked
}

/// Recommend a model for `prompt` from `candidates`.
///
/// Blank candidates are discarded first; with nothing usable left this is
/// an error the HTTP layer maps to 400.
pub fn recommend(prompt: &str, candidates: &[String]) -> Result<Recommendation> {
    let usable: Vec<String> = candidates
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if usable.is_empty() {
        return Err(Error::NoCandidates);
    }

    let ranked = rank(prompt, &usable);
    let top = &ranked[0];

    let prompt_lower = prompt.to_lowercase();
    let top_lower = top.model_id.to_lowercase();
    let reason = if contains_any(&prompt_lower, PROMPT_CODE_KEYWORDS)
        && contains_any(&top_lower, MODEL_CODE_HINTS)
    {
        "Coding-capable model matched coding intent."
    } else if contains_any(&prompt_lower, PROMPT_REASONING_KEYWORDS)
        && contains_any(&top_lower, MODEL_REASONING_HINTS)
    {
        "Reasoning-capable model matched analytical intent."
    } else {
        "Using default heuristic fallback."
    };

    Ok(Recommendation {
        recommended: top.model_id.clone(),
        ranked: ranked
            .iter()
            .take(RANKED_LIMIT)
            .map(|c| c.model_id.clone())
            .collect(),
        reason: reason.to_string(),
    })
}
