//! Model output is an untrusted payload: it is promoted to a typed value only after it
//! parses as exactly the expected JSON shape. Prose around the JSON is rejected; a single
//! surrounding code fence is tolerated.

use serde_json::{Map, Value};

pub fn strip_code_fence(raw: &str) -> &str {
    let t = raw.trim();
    let Some(inner) = t.strip_prefix("```") else {
        return t;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return t;
    };
    // Drop an info string such as `json` on the opening fence line.
    match inner.find('\n') {
        Some(nl) if inner[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => inner[nl + 1..].trim(),
        _ => inner.trim(),
    }
}

pub fn parse_array(raw: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(strip_code_fence(raw)).ok()? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

pub fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fence(raw)).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// String field, or `None` when absent or not a string.
pub fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// String items of an array field; non-string items are skipped.
pub fn str_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
