//! Payload health checks for the feed and its qualification fields.
//!
//! Used by `callsight diagnose` to spot truncated responses and records
//! whose qualification text was cut off by the upstream column limit.

use serde_json::Value;

use crate::qualification::{ParseStage, ParserConfig, parse_qualification_traced};
use crate::record::EngagementRecord;

const TAIL_CHARS: usize = 100;

/// Structural checks over a raw response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyReport {
    pub bytes: usize,
    pub open_braces: usize,
    pub close_braces: usize,
    pub open_brackets: usize,
    pub close_brackets: usize,
    /// Trimmed body ends with `}` or `]`.
    pub ends_cleanly: bool,
    /// Last characters of the trimmed body.
    pub tail: String,
}

impl BodyReport {
    pub fn inspect(body: &str) -> Self {
        let count = |needle: char| body.chars().filter(|&c| c == needle).count();
        let trimmed = body.trim();
        Self {
            bytes: body.len(),
            open_braces: count('{'),
            close_braces: count('}'),
            open_brackets: count('['),
            close_brackets: count(']'),
            ends_cleanly: trimmed.ends_with('}') || trimmed.ends_with(']'),
            tail: tail(trimmed, TAIL_CHARS).to_string(),
        }
    }

    /// Unclosed braces, negative when there are extra closers.
    pub fn brace_imbalance(&self) -> isize {
        self.open_braces as isize - self.close_braces as isize
    }

    pub fn bracket_imbalance(&self) -> isize {
        self.open_brackets as isize - self.close_brackets as isize
    }
}

/// Per-record view of the qualification field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualificationReport {
    pub engagement_id: String,
    pub company: String,
    /// Length in characters of the raw field, or of the compact JSON when it
    /// arrived as an object. `None` when the field is null.
    pub chars: Option<usize>,
    /// Raw length sits exactly on the configured truncation limit.
    pub at_limit: bool,
    /// Contains a markdown code fence.
    pub fenced: bool,
    /// String payload whose trimmed text ends with neither `}` nor a fence.
    pub looks_truncated: bool,
    pub stage: ParseStage,
    /// Number of top-level keys in the parse result.
    pub keys: usize,
}

impl QualificationReport {
    pub fn inspect(record: &EngagementRecord, config: &ParserConfig) -> Self {
        let raw = &record.qualification_data;
        let (parsed, stage) = parse_qualification_traced(raw, config);
        let keys = parsed.as_ref().and_then(Value::as_object).map_or(0, |m| m.len());

        let (chars, at_limit, fenced, looks_truncated) = match raw {
            Value::Null => (None, false, false, false),
            Value::String(s) => {
                let trimmed = s.trim();
                (
                    Some(s.chars().count()),
                    config.is_truncated(s),
                    s.contains("```"),
                    !trimmed.is_empty() && !trimmed.ends_with('}') && !trimmed.ends_with("```"),
                )
            }
            other => (Some(other.to_string().chars().count()), false, false, false),
        };

        Self {
            engagement_id: record.id().to_string(),
            company: record.company().to_string(),
            chars,
            at_limit,
            fenced,
            looks_truncated,
            stage,
            keys,
        }
    }

    /// Worth showing in a non-verbose diagnosis.
    pub fn is_suspect(&self) -> bool {
        self.at_limit || self.looks_truncated || self.stage == ParseStage::Unrecoverable
    }
}

/// Aggregate counts over a loaded feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub records: usize,
    pub with_qualification: usize,
    pub at_limit: usize,
    pub looks_truncated: usize,
    pub recovered_partially: usize,
    pub unrecoverable: usize,
}

impl FeedStats {
    pub fn collect(reports: &[QualificationReport]) -> Self {
        let mut stats = Self {
            records: reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.chars.is_some() {
                stats.with_qualification += 1;
            }
            if report.at_limit {
                stats.at_limit += 1;
            }
            if report.looks_truncated {
                stats.looks_truncated += 1;
            }
            match report.stage {
                ParseStage::Partial => stats.recovered_partially += 1,
                ParseStage::Unrecoverable => stats.unrecoverable += 1,
                _ => {}
            }
        }
        stats
    }
}

/// Inspect every record's qualification field.
pub fn inspect_records(
    records: &[EngagementRecord],
    config: &ParserConfig,
) -> Vec<QualificationReport> {
    records
        .iter()
        .map(|r| QualificationReport::inspect(r, config))
        .collect()
}

/// The last `n` characters of `s`.
fn tail(s: &str, n: usize) -> &str {
    let skip = s.chars().count().saturating_sub(n);
    match s.char_indices().nth(skip) {
        Some((at, _)) => &s[at..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(qualification: Value) -> EngagementRecord {
        serde_json::from_value(json!({
            "engagement_id": "e1",
            "external_company": "Acme",
            "qualification_data": qualification
        }))
        .unwrap()
    }

    #[test]
    fn body_balance() {
        let report = BodyReport::inspect(r#"[{"a": {"b": [1]}}, {"c": "#);
        assert_eq!(report.brace_imbalance(), 1);
        assert_eq!(report.bracket_imbalance(), 1);
        assert!(!report.ends_cleanly);

        let report = BodyReport::inspect("  [{}]\n");
        assert!(report.ends_cleanly);
        assert_eq!(report.tail, "[{}]");
    }

    #[test]
    fn tail_is_char_safe() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("hé", 10), "hé");
        assert_eq!(tail("", 3), "");
    }

    #[test]
    fn clean_record_is_not_suspect() {
        let report = QualificationReport::inspect(
            &record(json!("{\"call_analysis\": {\"call_type\": \"Demo\"}}")),
            &ParserConfig::default(),
        );
        assert_eq!(report.stage, ParseStage::Strict);
        assert_eq!(report.keys, 1);
        assert!(!report.is_suspect());
    }

    #[test]
    fn fenced_record_is_flagged_but_parses() {
        let report = QualificationReport::inspect(
            &record(json!("```json\n{\"deal_risks\": {\"other_risks\": [\"x\"]}}\n```")),
            &ParserConfig::default(),
        );
        assert!(report.fenced);
        assert!(!report.looks_truncated);
        assert_eq!(report.stage, ParseStage::Strict);
    }

    #[test]
    fn truncated_record_at_limit() {
        let raw = "{\"call_analysis\": {\"call_type\": \"Demo\"}, \"use_cases\": {\"a\"";
        let config = ParserConfig {
            truncation_limit: Some(raw.chars().count()),
        };
        let report = QualificationReport::inspect(&record(json!(raw)), &config);
        assert!(report.at_limit);
        assert!(report.looks_truncated);
        assert_eq!(report.stage, ParseStage::Partial);
        assert_eq!(report.keys, 1);
        assert!(report.is_suspect());
    }

    #[test]
    fn stats_aggregate() {
        let config = ParserConfig::default();
        let records = vec![
            record(Value::Null),
            record(json!("{\"call_analysis\": {\"call_type\": \"Demo\"}}")),
            record(json!("{\"call_analysis\": {\"call_ty")),
        ];
        let stats = FeedStats::collect(&inspect_records(&records, &config));
        assert_eq!(
            stats,
            FeedStats {
                records: 3,
                with_qualification: 2,
                at_limit: 0,
                looks_truncated: 1,
                recovered_partially: 0,
                unrecoverable: 1,
            }
        );
    }
}
