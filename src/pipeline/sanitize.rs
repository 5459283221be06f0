//! Strip Markdown code fences from a model reply so it can be parsed as JSON.
//!
//! Vision models asked for "ONLY a valid JSON object" still wrap it in
//! ```` ```json ```` fences more often than not. This stage removes the fences
//! and surrounding whitespace; it does not check that what remains is JSON.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_JSON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```json\s*").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```").unwrap());

/// Remove ```` ```json ```` openers (any case), every remaining ```` ``` ````, and trim.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let text = FENCE_JSON_RE.replace_all(raw, "");
    let text = FENCE_RE.replace_all(&text, "");
    text.trim().to_string()
}
