//! Pull JSON out of free-form model output.
//!
//! Models wrap JSON in prose, in ```json fences, or return it bare. Every
//! helper here tries the candidates in a fixed order and returns the first
//! one that actually parses.

use serde_json::Value;

/// Body of the first fenced code block, preferring a ```json fence.
pub fn fenced_block(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = response[json_start..].find("```") {
            return Some(response[json_start..json_start + end].trim());
        }
    }

    let start = response.find("```")?;
    let after_tick = &response[start + 3..];
    // Skip past any language identifier on the same line
    let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
    let end = after_tick[content_start..].find("```")?;
    Some(after_tick[content_start..content_start + end].trim())
}

/// A JSON object from the response: fenced block, then the greedy span from
/// the first `{` to the last `}`, then the whole response.
pub fn extract_object(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    let greedy = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
        _ => None,
    };

    [fenced_block(trimmed), greedy, Some(trimmed)]
        .into_iter()
        .flatten()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        })
}

/// A JSON array from the response: fenced block, then the first complete
/// top-level array in the text.
pub fn extract_array(response: &str) -> Option<Vec<Value>> {
    if let Some(Ok(Value::Array(items))) = fenced_block(response).map(serde_json::from_str::<Value>) {
        return Some(items);
    }

    response.match_indices('[').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&response[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items))) => Some(items),
            _ => None,
        }
    })
}

/// At most `max_chars` characters of `text`, for diagnostics.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
