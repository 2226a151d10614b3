//! Utility functions and helpers

use once_cell::sync::Lazy;
use regex::Regex;

/// Values shipped in the `.env` template, e.g. `your_openai_api_key_here`.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^your_[a-z0-9_]+_here$").expect("valid placeholder pattern"));

/// Whether a credential-like value is actually set.
///
/// Blank strings and untouched template placeholders count as unset.
pub fn is_configured(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !PLACEHOLDER.is_match(value)
}

/// Mask a secret for display, keeping a short prefix
pub fn mask_secret(value: &str) -> String {
    if !is_configured(value) {
        return "<not set>".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Truncate a string to a maximum byte length, ensuring valid UTF-8 boundaries
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        format!("{}...", &s[..end])
    }
}
