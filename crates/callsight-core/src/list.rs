use serde_json::Value;

/// Read a field that should hold a JSON array, tolerating string encoding.
///
/// Arrays pass through; strings are decoded and kept only if they decode to
/// an array. Everything else yields an empty list.
pub fn parse_list(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items.clone(),
        Value::String(text) if !text.trim().is_empty() => match serde_json::from_str(text) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
