//! Terminal output sanitizing.
//!
//! The codex CLI renders colored, cursor-addressed output. Everything relay
//! reads from it goes through [`sanitize`] before extraction or emission, so
//! downstream consumers only ever see plain text.

use std::sync::LazyLock;

use regex::Regex;

/// Full ANSI control sequence: ESC `[`, parameters, one terminating letter.
static ANSI_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("hard-coded pattern compiles"));

/// Color-code remnant whose ESC prefix was lost to partial decoding.
static ANSI_ORPHAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[0-9;]*m").expect("hard-coded pattern compiles"));

/// Strip ANSI control sequences and orphaned color-code remnants.
///
/// Runs the two passes to a fixpoint so that stripping one sequence can never
/// expose a remnant that survives the call: `sanitize(sanitize(x))` equals
/// `sanitize(x)` for every input.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = ANSI_ORPHAN_RE
            .replace_all(&ANSI_ESCAPE_RE.replace_all(&current, ""), "")
            .into_owned();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Best-effort decode of raw subprocess bytes, then [`sanitize`].
///
/// Invalid UTF-8 becomes replacement characters; decoding never fails a
/// stream.
pub fn sanitize_bytes(bytes: &[u8]) -> String {
    sanitize(&String::from_utf8_lossy(bytes))
}

/// Truncate to at most `max` characters for display, marking the cut.
pub fn truncate_for_display(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}
