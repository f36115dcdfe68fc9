use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object found in the response")]
    NotFound,
    #[error("response JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Slices the text between the first `{` and the last `}` and parses it.
///
/// Anything around the object (prose, markdown fences) is ignored. Several
/// objects in one response end up in a single span, which usually fails to
/// parse.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let candidate = json_span(text).ok_or(ExtractError::NotFound)?;
    Ok(serde_json::from_str(candidate)?)
}

fn json_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if close > open {
        return Some(&text[open..=close]);
    }
    None
}
