//! Display model for a parsed qualification.
//!
//! Turns a [`QualificationData`] into labelled sections of typed lines. The
//! CLI decides how each line looks; this module decides what is shown. A
//! section whose object is empty is omitted, as are sub-fields whose values
//! are JSON-falsy (null, false, 0, "", [], {}).

use serde_json::{Map, Value};

use crate::qualification::QualificationData;

/// Blocker placeholder the model emits when nobody was named.
const UNIDENTIFIED_BLOCKER: &str = "Not explicitly identified";

/// Section titles by wire key, in display order.
pub const SECTION_TITLES: [(&str, &str); 10] = [
    ("call_analysis", "Call Type"),
    ("compelling_event", "Timeline & Compelling Events"),
    ("current_state_analysis", "Current State & Challenges"),
    ("business_drivers", "Business Drivers"),
    ("economic_buyer", "Economic Buyer & Decision Process"),
    ("stakeholder_mapping", "Stakeholder Mapping"),
    ("justification", "Justification"),
    ("deal_risks", "Risks"),
    ("differentiation", "Differentiation"),
    ("use_cases", "Use Cases"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `label: value`
    Field { label: String, value: String },
    Heading(String),
    Bullet(String),
    /// Bullet nested under the previous bullet.
    SubBullet(String),
    /// De-emphasised note.
    Caption(String),
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: &'static str,
    pub title: &'static str,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Nothing parsed, or the result was not an object.
    Unavailable,
    /// Parsed, but none of the known sections carries content.
    NotMeaningful,
    Sections(Vec<Section>),
}

/// Summarise a parse result for display.
pub fn summarize(parsed: Option<&Value>) -> Summary {
    let Some(value) = parsed.filter(|v| v.as_object().is_some_and(|m| !m.is_empty())) else {
        return Summary::Unavailable;
    };
    match QualificationData::from_value(value) {
        Some(data) if data.has_meaningful_data() => Summary::Sections(build_sections(&data)),
        _ => Summary::NotMeaningful,
    }
}

/// Build one section per non-empty known key, in display order.
pub fn build_sections(data: &QualificationData) -> Vec<Section> {
    SECTION_TITLES
        .iter()
        .filter_map(|&(key, title)| {
            let map = data.section(key).filter(|m| !m.is_empty())?;
            let mut lines = Lines::default();
            match key {
                "call_analysis" => call_analysis(&mut lines, map),
                "compelling_event" => compelling_event(&mut lines, map),
                "current_state_analysis" => current_state(&mut lines, map),
                "business_drivers" => business_drivers(&mut lines, map),
                "economic_buyer" => economic_buyer(&mut lines, map),
                "stakeholder_mapping" => stakeholder_mapping(&mut lines, map),
                "justification" => justification(&mut lines, map),
                "deal_risks" => deal_risks(&mut lines, map),
                "differentiation" => differentiation(&mut lines, map),
                "use_cases" => use_cases(&mut lines, map),
                _ => {}
            }
            Some(Section {
                key,
                title,
                lines: lines.0,
            })
        })
        .collect()
}

// ── Section layouts ──

fn call_analysis(out: &mut Lines, map: &Map<String, Value>) {
    let call_type = present(map, "call_type").map_or_else(|| "N/A".to_string(), text);
    out.push_field("Type", call_type);
    if let Some(reasoning) = present(map, "call_type_reasoning") {
        out.0.push(Line::Caption(text(reasoning)));
    }
}

fn compelling_event(out: &mut Lines, map: &Map<String, Value>) {
    out.field("Timeline", map, "project_go_live_date");
    out.field("Consequences", map, "consequences_of_delay");
    out.list("Urgency Indicators", map, "urgency_indicators");
}

fn current_state(out: &mut Lines, map: &Map<String, Value>) {
    out.field("Current State", map, "current_state");
    out.list("Key Challenges", map, "challenges_pain");
    out.field("Desired Future State", map, "desired_future_state");
}

fn business_drivers(out: &mut Lines, map: &Map<String, Value>) {
    out.field("What's Driving Change", map, "what_is_driving_change");
    out.field("Impact", map, "impact");
    out.list("Desired Outcomes", map, "desired_outcomes");
}

fn economic_buyer(out: &mut Lines, map: &Map<String, Value>) {
    out.field("Economic Buyer", map, "who_is_economic_buyer");
    out.field("Decision Process", map, "decision_process");
    out.field("Approval Process", map, "approval_process");
}

fn stakeholder_mapping(out: &mut Lines, map: &Map<String, Value>) {
    if let Some(champion) = present(map, "coach_champion").and_then(Value::as_object) {
        out.0.push(Line::Heading("Champion".into()));
        if let Some(name) = present(champion, "name_role") {
            out.0.push(Line::Bullet(text(name)));
        }
        if let Some(matters) = present(champion, "what_matters_to_them") {
            out.0.push(Line::Bullet(format!("What matters: {}", text(matters))));
        }
    }
    if let Some(blocker) = present(map, "blocker").and_then(Value::as_object)
        && let Some(name) = present(blocker, "name_role")
        && name.as_str() != Some(UNIDENTIFIED_BLOCKER)
    {
        out.0.push(Line::Heading("Potential Blocker".into()));
        out.0.push(Line::Bullet(text(name)));
        if let Some(concerns) = present(blocker, "concerns") {
            out.0.push(Line::Bullet(format!("Concerns: {}", text(concerns))));
        }
    }
}

fn justification(out: &mut Lines, map: &Map<String, Value>) {
    for (key, heading) in [
        ("hard_dollars", "Hard Dollar Benefits"),
        ("soft_dollars", "Soft Dollar Benefits"),
    ] {
        let Some(group) = present(map, key).and_then(Value::as_object) else {
            continue;
        };
        out.0.push(Line::Heading(heading.into()));
        for (name, value) in group {
            if let Value::Array(items) = value
                && !items.is_empty()
            {
                out.0.push(Line::Heading(title_case(name)));
                out.0.extend(items.iter().map(|item| Line::Bullet(text(item))));
            }
        }
    }
}

fn deal_risks(out: &mut Lines, map: &Map<String, Value>) {
    out.list("Competition", map, "competitive_threats");
    out.list("Internal Obstacles", map, "internal_obstacles");
    out.list("Other Risks", map, "other_risks");
}

fn differentiation(out: &mut Lines, map: &Map<String, Value>) {
    out.list("Technical Differentiation", map, "unique_technical_differentiation");
    out.list("Business Advantages", map, "business_project_advantages");
}

fn use_cases(out: &mut Lines, map: &Map<String, Value>) {
    for use_case in map.values().filter_map(Value::as_object) {
        let Some(description) = present(use_case, "description") else {
            continue;
        };
        out.0.push(Line::Heading(text(description)));
        if let Some(volume) = present(use_case, "data_volume") {
            out.0.push(Line::Bullet(format!("Volume: {}", text(volume))));
        }
        if let Some(frequency) = present(use_case, "frequency") {
            out.0.push(Line::Bullet(format!("Frequency: {}", text(frequency))));
        }
        if let Some(requirements) = present(use_case, "technical_requirements") {
            out.0.push(Line::Bullet("Requirements:".into()));
            out.0.extend(items(requirements).into_iter().map(Line::SubBullet));
        }
        out.0.push(Line::Divider);
    }
}

// ── Helpers ──

#[derive(Default)]
struct Lines(Vec<Line>);

impl Lines {
    fn push_field(&mut self, label: &str, value: String) {
        self.0.push(Line::Field {
            label: label.to_string(),
            value,
        });
    }

    fn field(&mut self, label: &str, map: &Map<String, Value>, key: &str) {
        if let Some(value) = present(map, key) {
            self.push_field(label, text(value));
        }
    }

    fn list(&mut self, heading: &str, map: &Map<String, Value>, key: &str) {
        if let Some(value) = present(map, key) {
            self.0.push(Line::Heading(heading.to_string()));
            self.0.extend(items(value).into_iter().map(Line::Bullet));
        }
    }
}

/// The value under `key`, if it is truthy.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| truthy(v))
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Strings as-is, everything else as compact JSON.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// List entries as text; a lone scalar counts as a one-item list.
fn items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text).collect(),
        other => vec![text(other)],
    }
}

/// `cost_savings` → `Cost Savings`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
