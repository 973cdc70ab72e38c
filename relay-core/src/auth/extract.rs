//! Pairing-code and verification-URL extraction from codex login output.
//!
//! The CLI renders its device code through an interactive UI, so the text
//! that reaches us may be colored, garbled, or split one character per line.
//! Two patterns are tried in order; both feed [`normalize_code`], which owns
//! the canonical `XXXX-XXXXX` form. Treat these as versioned parsers: a CLI
//! output-format change lands here and nowhere else.

use std::sync::LazyLock;

use regex::Regex;

/// Verification page shown alongside the pairing code.
pub const VERIFICATION_URL: &str = "https://auth.openai.com/codex/device";

/// Placeholder the CLI prints in its own usage text; never a real code.
const USAGE_PLACEHOLDER: &str = "AUTHUSAGE";

/// Preferred rendering: 4 characters, a short separator, 5 characters.
static DEVICE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z0-9]{4})[^A-Z0-9\r\n]{0,3}([A-Z0-9]{5})\b")
        .expect("hard-coded pattern compiles")
});

/// Fallback for split rendering: nine isolated alphanumerics separated by
/// anything non-alphanumeric, including one-char-per-line (`Y\nI\nR\n7...`).
static DEVICE_CODE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z0-9](?:[^A-Z0-9]+[A-Z0-9]){8})\b").expect("hard-coded pattern compiles")
});

/// Normalize a raw code candidate to `XXXX-XXXXX`.
///
/// Keeps alphanumerics in their original order, requires exactly nine of
/// them, and rejects the CLI's usage placeholder.
pub fn normalize_code(raw: &str) -> Option<String> {
    let alnum: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if alnum.len() != 9 || alnum == USAGE_PLACEHOLDER {
        return None;
    }
    Some(format!("{}-{}", &alnum[..4], &alnum[4..]))
}

/// Extract a device pairing code from sanitized CLI output.
pub fn extract_device_code(output: &str) -> Option<String> {
    let upper = output.to_uppercase();

    if let Some(caps) = DEVICE_CODE_RE.captures(&upper) {
        if let Some(code) = normalize_code(&format!("{}{}", &caps[1], &caps[2])) {
            return Some(code);
        }
    }

    if let Some(caps) = DEVICE_CODE_SPLIT_RE.captures(&upper) {
        if let Some(code) = normalize_code(&caps[1]) {
            return Some(code);
        }
    }

    None
}

/// Find the verification URL in CLI output.
pub fn extract_verification_url(output: &str) -> Option<&'static str> {
    output.contains(VERIFICATION_URL).then_some(VERIFICATION_URL)
}
