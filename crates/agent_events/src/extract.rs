//! Helpers for pulling JSON out of free-form model replies.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractJsonError {
    #[error("no JSON found in response")]
    NoJson,
    #[error("parsing JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Drops every line that starts (after indentation) with a markdown fence.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        if line.trim().starts_with("```") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Parses the span from the first `{` to the last `}`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ExtractJsonError> {
    extract_between(text, '{', '}')
}

/// Parses the span from the first `[` to the last `]`.
pub fn extract_json_array<T: DeserializeOwned>(text: &str) -> Result<T, ExtractJsonError> {
    extract_between(text, '[', ']')
}

fn extract_between<T: DeserializeOwned>(
    text: &str,
    open: char,
    close: char,
) -> Result<T, ExtractJsonError> {
    let stripped = strip_code_fences(text);
    let (Some(start), Some(end)) = (stripped.find(open), stripped.rfind(close)) else {
        return Err(ExtractJsonError::NoJson);
    };
    if end <= start {
        return Err(ExtractJsonError::NoJson);
    }
    Ok(serde_json::from_str(&stripped[start..=end])?)
}
