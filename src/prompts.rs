//! The instruction text sent alongside each first-page image.
//!
//! Role assignment is performed by the model, not by this crate: the rules
//! below are the whole of the classification logic. Keeping them in one
//! constant makes prompt regressions visible in review and testable without a
//! live endpoint.
//!
//! Callers can override the default via [`crate::config::ExtractionConfig::prompt`].

/// Default author-extraction prompt.
///
/// Rule order matters: rule 2 overrides rule 1, rule 3 is orthogonal to both,
/// rule 4 catches everyone left over.
pub const AUTHOR_EXTRACTION_PROMPT: &str = r#"Analyze this image of a research paper's first page.
Extract the author list and determine their specific roles based on these RULES:

1. **First Author**: The first name listed is ALWAYS the "First Author", UNLESS a symbol indicates equal contribution.
2. **Co-First Authors**: If a symbol (like † or ‡) notes "These authors contributed equally", then label ALL marked authors as "Co-First Author".
3. **Corresponding Author**: Look for an asterisk (*) or an email address in the footnotes. This person is "Corresponding Author" (they can also be First or Co-Author). Record this with "is_corresponding": true and keep their First Author / Co-First Author / Co-Author role.
4. **Co-Author**: Everyone else is a "Co-Author".

List the authors in the order they appear on the page.

Return ONLY a valid JSON object:
{
  "authors": [
    {
      "name": "Name",
      "role": "First Author / Co-First Author / Co-Author",
      "is_corresponding": true/false,
      "affiliation": "Affiliation",
      "email": "Email (only if available)"
    }
  ]
}"#;

/// Build the instruction text for one extraction call.
///
/// Pure and deterministic; a non-empty `custom` prompt replaces the default.
pub fn build_prompt(custom: Option<&str>) -> &str {
    match custom {
        Some(p) if !p.trim().is_empty() => p,
        _ => AUTHOR_EXTRACTION_PROMPT,
    }
}
