//! Tolerant parsing of the `qualification_data` field.
//!
//! The field is supposed to hold a JSON object, but in practice arrives
//! fenced in markdown, prefixed with stray text, or cut off by the upstream
//! column limit. [`parse_qualification`] runs an ordered series of attempts
//! and stops at the first one that yields a result:
//!
//! 1. normalise (trim, strip markdown fences)
//! 2. strict decode
//! 3. decode from the first `{`
//! 4. field-by-field salvage, only when the raw length sits exactly on the
//!    truncation limit
//!
//! No attempt ever returns an error; failure degrades to `None`.

use serde_json::{Map, Value};
use tracing::debug;

use crate::partial::extract_partial;

/// Top-level qualification keys, in display order.
pub const KNOWN_FIELDS: [&str; 10] = [
    "call_analysis",
    "compelling_event",
    "current_state_analysis",
    "business_drivers",
    "economic_buyer",
    "stakeholder_mapping",
    "justification",
    "deal_risks",
    "differentiation",
    "use_cases",
];

/// Character count at which the backing column cuts the field off.
pub const DEFAULT_TRUNCATION_LIMIT: usize = 8043;

const FENCE: &str = "```";

/// Knobs for [`parse_qualification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Exact raw length that marks a payload as truncated upstream.
    /// `None` disables field-by-field recovery.
    pub truncation_limit: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            truncation_limit: Some(DEFAULT_TRUNCATION_LIMIT),
        }
    }
}

impl ParserConfig {
    /// Whether `raw` has exactly the truncation length, counted in characters.
    pub fn is_truncated(&self, raw: &str) -> bool {
        self.truncation_limit
            .is_some_and(|limit| raw.chars().count() == limit)
    }
}

/// Which step of the pipeline settled the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Null, non-string, or blank input.
    Absent,
    /// Input was already an object.
    PassThrough,
    Strict,
    LeadingObject,
    Partial,
    /// Every attempt failed.
    Unrecoverable,
}

/// Parse a raw qualification value. Never fails.
pub fn parse_qualification(raw: &Value, config: &ParserConfig) -> Option<Value> {
    parse_qualification_traced(raw, config).0
}

/// [`parse_qualification`], also reporting the stage that produced the result.
pub fn parse_qualification_traced(
    raw: &Value,
    config: &ParserConfig,
) -> (Option<Value>, ParseStage) {
    match raw {
        Value::Object(_) => (Some(raw.clone()), ParseStage::PassThrough),
        Value::String(s) => parse_str(s, config),
        _ => (None, ParseStage::Absent),
    }
}

fn parse_str(raw: &str, config: &ParserConfig) -> (Option<Value>, ParseStage) {
    if raw.trim().is_empty() {
        return (None, ParseStage::Absent);
    }

    let cleaned = normalize(raw);

    if let Some(value) = strict(cleaned) {
        return (non_empty(value), ParseStage::Strict);
    }

    if let Some(value) = leading_object(cleaned) {
        return (non_empty(value), ParseStage::LeadingObject);
    }

    if config.is_truncated(raw) {
        let recovered = extract_partial(raw);
        debug!(
            len = raw.len(),
            fields = recovered.as_ref().map_or(0, Map::len),
            "salvaged truncated qualification payload"
        );
        return (recovered.map(Value::Object), ParseStage::Partial);
    }

    debug!(len = raw.len(), "qualification payload is unparseable");
    (None, ParseStage::Unrecoverable)
}

/// Trim and strip a surrounding markdown code fence.
pub fn normalize(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = strip_language_tag(rest);
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Drop a fence info string such as `json` directly after the opening fence.
/// A word only counts as a tag when whitespace follows it.
fn strip_language_tag(text: &str) -> &str {
    let tag_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
        .unwrap_or(text.len());
    let (tag, rest) = text.split_at(tag_len);
    if tag.starts_with(|c: char| c.is_ascii_alphabetic())
        && rest.starts_with(char::is_whitespace)
    {
        rest
    } else {
        text
    }
}

fn strict(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Decode from the first `{` when it is preceded by other text.
fn leading_object(text: &str) -> Option<Value> {
    match text.find('{') {
        Some(start) if start > 0 => strict(&text[start..]),
        _ => None,
    }
}

/// An empty object means "no data"; anything else passes through.
fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Object(map) if map.is_empty() => None,
        _ => Some(value),
    }
}

/// Typed view over a parsed qualification object.
///
/// Only JSON objects are kept under the known keys; any other value is
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualificationData {
    pub call_analysis: Option<Map<String, Value>>,
    pub compelling_event: Option<Map<String, Value>>,
    pub current_state_analysis: Option<Map<String, Value>>,
    pub business_drivers: Option<Map<String, Value>>,
    pub economic_buyer: Option<Map<String, Value>>,
    pub stakeholder_mapping: Option<Map<String, Value>>,
    pub justification: Option<Map<String, Value>>,
    pub deal_risks: Option<Map<String, Value>>,
    pub differentiation: Option<Map<String, Value>>,
    pub use_cases: Option<Map<String, Value>>,
}

impl QualificationData {
    /// Build the view from a parse result. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let section = |key: &str| map.get(key).and_then(Value::as_object).cloned();
        Some(Self {
            call_analysis: section("call_analysis"),
            compelling_event: section("compelling_event"),
            current_state_analysis: section("current_state_analysis"),
            business_drivers: section("business_drivers"),
            economic_buyer: section("economic_buyer"),
            stakeholder_mapping: section("stakeholder_mapping"),
            justification: section("justification"),
            deal_risks: section("deal_risks"),
            differentiation: section("differentiation"),
            use_cases: section("use_cases"),
        })
    }

    /// Look a section up by its wire key.
    pub fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        match key {
            "call_analysis" => self.call_analysis.as_ref(),
            "compelling_event" => self.compelling_event.as_ref(),
            "current_state_analysis" => self.current_state_analysis.as_ref(),
            "business_drivers" => self.business_drivers.as_ref(),
            "economic_buyer" => self.economic_buyer.as_ref(),
            "stakeholder_mapping" => self.stakeholder_mapping.as_ref(),
            "justification" => self.justification.as_ref(),
            "deal_risks" => self.deal_risks.as_ref(),
            "differentiation" => self.differentiation.as_ref(),
            "use_cases" => self.use_cases.as_ref(),
            _ => None,
        }
    }

    /// True when at least one known section holds a non-empty object.
    pub fn has_meaningful_data(&self) -> bool {
        KNOWN_FIELDS
            .iter()
            .any(|key| self.section(key).is_some_and(|m| !m.is_empty()))
    }
}
