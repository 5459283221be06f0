//! Parse the sanitised reply and map each author object onto an [`AuthorRecord`].
//!
//! Mapping is structural only: `role` is passed through verbatim even when it
//! is not one of the four canonical labels.

use crate::error::ParseError;
use crate::output::AuthorRecord;
use serde_json::{Map, Value};

/// A single author object as the model returned it.
pub type RawAuthor = Map<String, Value>;

/// Parse `{"authors": [...]}` into its author objects, in order.
///
/// A missing `authors` key means zero authors. Invalid JSON, a non-object
/// top level, a non-array `authors` (including `null`), or a non-object entry
/// is an error.
pub fn parse_response(text: &str) -> Result<Vec<RawAuthor>, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ParseError::InvalidJson {
        detail: e.to_string(),
    })?;

    let mut root = match value {
        Value::Object(root) => root,
        other => {
            return Err(ParseError::NotAnObject {
                found: kind_of(&other).to_string(),
            })
        }
    };

    match root.remove("authors") {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(obj) => Ok(obj),
                _ => Err(ParseError::InvalidEntry { index }),
            })
            .collect(),
        Some(other) => Err(ParseError::AuthorsNotArray {
            found: kind_of(&other).to_string(),
        }),
    }
}

/// Map parsed author objects to records for `source_file`, preserving order.
pub fn map_authors(authors: &[RawAuthor], source_file: &str) -> Vec<AuthorRecord> {
    authors
        .iter()
        .map(|a| AuthorRecord {
            source_file: source_file.to_string(),
            name: text_field(a, "name").unwrap_or_default(),
            role: text_field(a, "role").unwrap_or_default(),
            is_corresponding: flag_field(a, "is_corresponding"),
            affiliation: text_field(a, "affiliation"),
            email: text_field(a, "email"),
        })
        .collect()
}

/// String value of `key`; numbers and booleans are stringified, `null` counts as absent.
fn text_field(obj: &RawAuthor, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}

/// Tri-state flag: JSON booleans and the strings "true"/"false"/"yes"/"no".
fn flag_field(obj: &RawAuthor, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
