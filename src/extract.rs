use serde_json::{Map, Value};

/// Why no JSON object could be recovered from a free-text response.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NotFound,

    #[error("response contains an invalid JSON object: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Best-effort recovery of a JSON object embedded in surrounding text.
///
/// Takes everything from the first `{` to the last `}` and parses it. Text
/// before and after (explanations, code fences) is ignored.
pub fn extract_json_object(
    text: &str,
) -> Result<Map<String, Value>, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NotFound)?;
    let end = text.rfind('}').ok_or(ExtractError::NotFound)?;
    if end < start {
        return Err(ExtractError::NotFound);
    }

    Ok(serde_json::from_str(&text[start..=end])?)
}
