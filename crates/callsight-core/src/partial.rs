//! Field-by-field salvage of truncated qualification payloads.
//!
//! When the upstream column cuts a payload off mid-object, the document as a
//! whole no longer decodes, but the sections written before the cut usually
//! do. For each known key we find `"<key>":`, locate the opening brace of its
//! value, and scan for the matching close brace while ignoring braces inside
//! string literals. Complete objects are decoded; anything cut off is dropped.

use serde_json::{Map, Value};

use crate::qualification::KNOWN_FIELDS;

/// Sections recovered from a truncated payload, keyed by field name.
pub type PartialQualificationData = Map<String, Value>;

/// Recover every known section whose value object is complete in `raw`.
///
/// Returns `None` when nothing could be recovered.
pub fn extract_partial(raw: &str) -> Option<PartialQualificationData> {
    let mut recovered = Map::new();
    for field in KNOWN_FIELDS {
        if let Some(value) = recover_field(raw, field) {
            recovered.insert(field.to_string(), value);
        }
    }
    if recovered.is_empty() {
        None
    } else {
        Some(recovered)
    }
}

fn recover_field(raw: &str, field: &str) -> Option<Value> {
    let key = format!("\"{field}\":");
    let key_at = raw.find(&key)?;
    let open = key_at + raw[key_at..].find('{')?;
    let close = matching_brace(raw, open)?;
    serde_json::from_str(&raw[open..=close]).ok()
}

/// Byte offset of the `}` that closes the `{` at `open`.
///
/// Braces inside string literals are ignored, and a backslash inside a
/// string escapes the following byte. Returns `None` if `open` is not a `{`
/// or the text ends before the object closes.
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_nested_objects() {
        let text = r#"x {"a": {"b": {}}, "c": 1} tail"#;
        let close = matching_brace(text, 2).unwrap();
        assert_eq!(&text[2..=close], r#"{"a": {"b": {}}, "c": 1}"#);
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"note": "a } here", "x": 1}"#;
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));

        let text = r#"{"note": "open { only", "x": 1}"#;
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn escaped_quote_stays_in_string() {
        let text = r#"{"q": "say \"}\" twice", "n": 2}"#;
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn unterminated_object_has_no_match() {
        assert_eq!(matching_brace(r#"{"a": {"b": 1}"#, 0), None);
        assert_eq!(matching_brace(r#"{"a": "}"#, 0), None);
    }

    #[test]
    fn non_brace_start_has_no_match() {
        assert_eq!(matching_brace("abc", 0), None);
        assert_eq!(matching_brace("{}", 5), None);
    }

    #[test]
    fn multibyte_text_is_scanned_safely() {
        let text = r#"{"city": "Zürich } ü", "ok": true}"#;
        let close = matching_brace(text, 0).unwrap();
        assert_eq!(close, text.len() - 1);
    }

    #[test]
    fn recovers_complete_sections_only() {
        let raw = concat!(
            r#"{"call_analysis": {"call_type": "Discovery", "#,
            r#""call_type_reasoning": "intro {call}"}, "#,
            r#""deal_risks": {"other_risks": ["budget"]}, "#,
            r#""use_cases": {"uc1": {"description": "Sync ER"#
        );
        let recovered = extract_partial(raw).unwrap();
        assert_eq!(recovered.len(), 2);
        assert_eq!(
            recovered["call_analysis"],
            json!({ "call_type": "Discovery", "call_type_reasoning": "intro {call}" })
        );
        assert_eq!(recovered["deal_risks"], json!({ "other_risks": ["budget"] }));
        assert!(!recovered.contains_key("use_cases"));
    }

    #[test]
    fn nothing_recoverable_is_none() {
        assert_eq!(extract_partial(r#"{"call_analysis": {"call_type": "Disc"#), None);
        assert_eq!(extract_partial("no json at all"), None);
    }

    #[test]
    fn undecodable_section_is_skipped() {
        let raw = r#"{"economic_buyer": {bad json}, "justification": {"hard_dollars": {}}"#;
        let recovered = extract_partial(raw).unwrap();
        assert!(!recovered.contains_key("economic_buyer"));
        assert_eq!(recovered["justification"], json!({ "hard_dollars": {} }));
    }
}
