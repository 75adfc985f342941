//! Decoding of the engagement feed response body.

use serde_json::Value;
use tracing::{info, warn};

use crate::FeedError;
use crate::record::EngagementRecord;

/// Decode response bytes as UTF-8, replacing invalid sequences.
pub fn decode_body(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decode a feed body into records.
///
/// Accepts a bare array of records, an object with a `data` array, or a
/// single record object. Array entries that are not objects are skipped.
pub fn decode_feed(body: &str) -> Result<Vec<EngagementRecord>, FeedError> {
    let value: Value = serde_json::from_str(body)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FeedError::Shape(format!(
                    "`data` holds {} instead of an array",
                    kind(&other)
                )));
            }
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(FeedError::Shape(format!(
                "expected an array or object, got {}",
                kind(&other)
            )));
        }
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(index, kind = kind(&item), "skipping non-object feed entry");
            continue;
        }
        records.push(serde_json::from_value(item)?);
    }
    info!(count = records.len(), skipped = total - records.len(), "decoded feed");
    Ok(records)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
