//! Engagement records as delivered by the feed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::list::parse_list;
use crate::qualification::{ParserConfig, QualificationData, parse_qualification};

/// Naive timestamp layouts seen in the feed, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// One recorded sales conversation.
///
/// Every field is optional on the wire. Missing, `null`, and blank strings all
/// deserialise to `None`; numeric identifiers are stringified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngagementRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub engagement_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub external_company: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub call_owner: Option<String>,
    /// Raw creation timestamp; see [`created_at_utc`](Self::created_at_utc).
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    /// Platform tag (`dialer` or `meeting`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub engagement_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: Option<String>,
    /// JSON-encoded participant list, an inline list, or null.
    #[serde(default)]
    pub participants: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub opp_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub opp_id: Option<String>,
    /// Call recording URL.
    #[serde(default, deserialize_with = "lenient_string")]
    pub chorus_link: Option<String>,
    /// Analysis document URL.
    #[serde(default, deserialize_with = "lenient_string")]
    pub pdf_tool_analysis_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transcript: Option<String>,
    /// String-encoded qualification object, an inline object, or null.
    #[serde(default)]
    pub qualification_data: Value,
}

/// A contact on the call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Participant {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
}

/// Originating call platform, derived from the `engagement_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Outreach,
    Chorus,
}

impl Platform {
    /// Label a tag the way the dashboard does: `dialer` is Outreach, anything else Chorus.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("dialer") => Platform::Outreach,
            _ => Platform::Chorus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Outreach => "Outreach",
            Platform::Chorus => "Chorus",
        }
    }

    /// The feed tag this platform is stored under.
    pub fn tag(self) -> &'static str {
        match self {
            Platform::Outreach => "dialer",
            Platform::Chorus => "meeting",
        }
    }

    /// Exact tag match, used for filtering.
    pub fn matches(self, tag: Option<&str>) -> bool {
        tag == Some(self.tag())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outreach" | "dialer" => Ok(Platform::Outreach),
            "chorus" | "meeting" => Ok(Platform::Chorus),
            other => Err(format!("unknown platform '{other}' (expected outreach or chorus)")),
        }
    }
}

impl EngagementRecord {
    pub fn id(&self) -> &str {
        self.engagement_id.as_deref().unwrap_or("")
    }

    pub fn company(&self) -> &str {
        self.external_company.as_deref().unwrap_or("Unknown")
    }

    pub fn owner(&self) -> &str {
        self.call_owner.as_deref().unwrap_or("")
    }

    /// Owner with any `@domain` suffix removed.
    pub fn owner_handle(&self) -> &str {
        let owner = self.owner();
        owner.split('@').next().unwrap_or(owner)
    }

    pub fn platform(&self) -> Platform {
        Platform::from_tag(self.engagement_type.as_deref())
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Participant objects from the raw list; non-object entries are dropped.
    pub fn participants(&self) -> Vec<Participant> {
        parse_list(&self.participants)
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// Parse the qualification field into its typed view.
    pub fn qualification(&self, config: &ParserConfig) -> Option<QualificationData> {
        parse_qualification(&self.qualification_data, config)
            .as_ref()
            .and_then(QualificationData::from_value)
    }

    /// `call_analysis.call_type`, if the qualification carries one.
    pub fn call_type(&self, config: &ParserConfig) -> Option<String> {
        let data = self.qualification(config)?;
        match data.call_analysis?.get("call_type")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// CRM deep link for the linked opportunity.
    pub fn opportunity_url(&self, base: &str) -> Option<String> {
        let id = self.opp_id.as_deref()?;
        Some(format!("{}/{}/view", base.trim_end_matches('/'), id))
    }
}

/// Parse a feed timestamp: RFC 3339, naive date-times (as UTC), or a bare date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
