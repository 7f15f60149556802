//! Best-effort JSON extraction from free-text model output.
//!
//! The prompt asks for a single JSON object, but models still wrap output in
//! code fences or prose. The decoder strips fences, then takes the first
//! balanced `{…}` region and deserializes it. Failure is a typed error, never
//! a panic — callers fall back to their "unclear" sentinels.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON object found in model output")]
    NoObject,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Extracts and deserializes the first balanced `{…}` region of `text`.
pub fn extract_json_object<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    let text = strip_json_fences(text);
    let region = first_balanced_object(text).ok_or(DecodeError::NoObject)?;
    Ok(serde_json::from_str(region)?)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Returns the first `{…}` slice with balanced braces, honoring string
/// literals and escapes so braces inside values do not end the region early.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
