use crate::traits::{LlmError, LlmResult};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

fn inline_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\{.*\})").ok()).as_ref()
}

/// Pull a JSON object out of model output that may wrap it in a code fence
/// or surround it with prose.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(caps) = fence_re()?.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    inline_re()?
        .captures(text)
        .and_then(|c| c.get(1).map(|m| m.as_str()))
}

/// Parse model output into a JSON object.
///
/// The whole reply is tried first; if that fails, the first fenced or inline
/// object is tried. Anything that does not yield an object is rejected.
pub fn parse_json_object(text: &str) -> LlmResult<Value> {
    let trimmed = text.trim();
    let value = serde_json::from_str::<Value>(trimmed).or_else(|first| {
        extract_json_block(trimmed)
            .ok_or(first)
            .and_then(serde_json::from_str::<Value>)
    });

    match value {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(LlmError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
        Err(e) => Err(LlmError::InvalidResponse(format!(
            "reply is not JSON ({e}): {}",
            preview(trimmed)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
