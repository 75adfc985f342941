//! Filtering, ordering, and pagination of the engagement list.
//!
//! All functions are pure over a borrowed record slice; the caller owns
//! session state (current page, selection) and passes it in.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::record::{EngagementRecord, Participant, Platform};

/// Selectable page sizes.
pub const PAGE_SIZES: [usize; 6] = [5, 10, 15, 20, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Identifies participants from the seller's own organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalOrg {
    /// Matched case-insensitively against the participant's company.
    pub name: String,
    /// Matched case-insensitively against the participant's email.
    pub email_domain: String,
}

impl Default for InternalOrg {
    fn default() -> Self {
        Self {
            name: "SnapLogic".into(),
            email_domain: "snaplogic.com".into(),
        }
    }
}

impl InternalOrg {
    pub fn is_member(&self, participant: &Participant) -> bool {
        let company_match = participant
            .company_name
            .as_deref()
            .is_some_and(|c| contains_ignore_case(c, &self.name));
        let email_match = participant
            .email
            .as_deref()
            .is_some_and(|e| contains_ignore_case(e, &self.email_domain));
        company_match || email_match
    }
}

/// How often an internal participant shows up across the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTally {
    pub email: Option<String>,
    pub company: Option<String>,
    pub count: usize,
}

/// Internal participants by name, sorted. Contact details come from the first sighting.
pub fn internal_participants(
    records: &[EngagementRecord],
    org: &InternalOrg,
) -> BTreeMap<String, ParticipantTally> {
    let mut tallies: BTreeMap<String, ParticipantTally> = BTreeMap::new();
    for participant in records.iter().flat_map(EngagementRecord::participants) {
        if !org.is_member(&participant) {
            continue;
        }
        let Some(name) = participant.name else {
            continue;
        };
        tallies
            .entry(name)
            .and_modify(|t| t.count += 1)
            .or_insert(ParticipantTally {
                email: participant.email,
                company: participant.company_name,
                count: 1,
            });
    }
    tallies
}

/// Distinct linked opportunity names, sorted.
pub fn opportunity_names(records: &[EngagementRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().filter_map(|r| r.opp_name.clone()).collect();
    names.sort();
    names.dedup();
    names
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpportunityFilter {
    #[default]
    Any,
    Linked,
    Unlinked,
    Named(String),
}

impl FromStr for OpportunityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("opportunity filter cannot be empty".into());
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "any" | "all" => OpportunityFilter::Any,
            "linked" | "has" => OpportunityFilter::Linked,
            "unlinked" | "none" => OpportunityFilter::Unlinked,
            _ => OpportunityFilter::Named(trimmed.to_string()),
        })
    }
}

impl OpportunityFilter {
    fn accepts(&self, record: &EngagementRecord) -> bool {
        match self {
            OpportunityFilter::Any => true,
            OpportunityFilter::Linked => record.opp_name.is_some(),
            OpportunityFilter::Unlinked => record.opp_name.is_none(),
            OpportunityFilter::Named(name) => record.opp_name.as_deref() == Some(name.as_str()),
        }
    }
}

/// Criteria for the engagement list. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementFilter {
    pub platform: Option<Platform>,
    /// Exact name of an internal participant.
    pub participant: Option<String>,
    pub opportunity: OpportunityFilter,
    /// Case-insensitive substring of the company or owner.
    pub search: Option<String>,
}

impl EngagementFilter {
    pub fn accepts(&self, record: &EngagementRecord, org: &InternalOrg) -> bool {
        if let Some(platform) = self.platform
            && !platform.matches(record.engagement_type.as_deref())
        {
            return false;
        }
        if let Some(name) = &self.participant
            && !record
                .participants()
                .iter()
                .any(|p| p.name.as_deref() == Some(name.as_str()) && org.is_member(p))
        {
            return false;
        }
        if !self.opportunity.accepts(record) {
            return false;
        }
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let hit = [&record.external_company, &record.call_owner]
                .into_iter()
                .flatten()
                .any(|field| contains_ignore_case(field, term));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Matching records, newest first. Records without a parseable date sort last.
    pub fn apply<'a>(
        &self,
        records: &'a [EngagementRecord],
        org: &InternalOrg,
    ) -> Vec<&'a EngagementRecord> {
        let mut matched: Vec<&EngagementRecord> =
            records.iter().filter(|r| self.accepts(r, org)).collect();
        matched.sort_by_cached_key(|r| Reverse(r.created_at_utc()));
        matched
    }
}

/// Requested page position. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A resolved page over `total_records` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number actually shown.
    pub number: usize,
    pub total_pages: usize,
    pub total_records: usize,
    /// Slice bounds into the filtered list.
    pub start: usize,
    pub end: usize,
}

impl Page {
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start.min(items.len())..self.end.min(items.len())]
    }

    /// 1-based inclusive range for "Showing a-b of n", if anything is shown.
    pub fn showing(&self) -> Option<(usize, usize)> {
        (self.total_records > 0).then_some((self.start + 1, self.end))
    }

    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Resolve a page request. A page past the end, or page 0, falls back to page 1.
pub fn paginate(total_records: usize, request: Pagination) -> Page {
    let per_page = request.per_page.max(1);
    let total_pages = if total_records == 0 {
        1
    } else {
        total_records.div_ceil(per_page)
    };
    let number = if request.page == 0 || request.page > total_pages {
        1
    } else {
        request.page
    };
    let start = (number - 1) * per_page;
    let end = (start + per_page).min(total_records);
    Page {
        number,
        total_pages,
        total_records,
        start,
        end,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> EngagementRecord {
        serde_json::from_value(value).unwrap()
    }

    fn fixture() -> Vec<EngagementRecord> {
        vec![
            record(json!({
                "engagement_id": "1",
                "external_company": "Acme Corp",
                "call_owner": "rep.one@snaplogic.com",
                "engagement_type": "meeting",
                "created_at": "2025-01-10T09:00:00Z",
                "opp_name": "Acme Expansion",
                "participants": concat!(
                    r#"[{"name":"Rep One","email":"rep.one@snaplogic.com","#,
                    r#""company_name":"SnapLogic"},"#,
                    r#"{"name":"Buyer","company_name":"Acme"}]"#
                )
            })),
            record(json!({
                "engagement_id": "2",
                "external_company": "Globex",
                "call_owner": "rep.two@snaplogic.com",
                "engagement_type": "dialer",
                "created_at": "2025-02-01T09:00:00Z",
                "participants": [{"name":"Rep Two","company_name":"SnapLogic Inc"}]
            })),
            record(json!({
                "engagement_id": "3",
                "external_company": "Initech",
                "call_owner": "rep.one@snaplogic.com",
                "engagement_type": "meeting",
                "created_at": "garbled",
                "opp_name": "Initech New Logo",
                "participants": [{"name":"Rep One","email":"Rep.One@SnapLogic.com"}]
            })),
        ]
    }

    fn ids(records: &[&EngagementRecord]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn membership_by_company_or_email() {
        let org = InternalOrg::default();
        let by_company = Participant {
            company_name: Some("snaplogic".into()),
            ..Default::default()
        };
        let by_email = Participant {
            email: Some("x@SNAPLOGIC.COM".into()),
            ..Default::default()
        };
        let outsider = Participant {
            name: Some("Buyer".into()),
            company_name: Some("Acme".into()),
            email: Some("b@acme.io".into()),
        };
        assert!(org.is_member(&by_company));
        assert!(org.is_member(&by_email));
        assert!(!org.is_member(&outsider));
    }

    #[test]
    fn tallies_internal_participants() {
        let tallies = internal_participants(&fixture(), &InternalOrg::default());
        let names: Vec<&str> = tallies.keys().map(String::as_str).collect();
        assert_eq!(names, ["Rep One", "Rep Two"]);
        assert_eq!(tallies["Rep One"].count, 2);
        assert_eq!(
            tallies["Rep One"].email.as_deref(),
            Some("rep.one@snaplogic.com")
        );
    }

    #[test]
    fn empty_filter_sorts_newest_first() {
        let records = fixture();
        let matched = EngagementFilter::default().apply(&records, &InternalOrg::default());
        assert_eq!(ids(&matched), ["2", "1", "3"]);
    }

    #[test]
    fn platform_filter() {
        let records = fixture();
        let filter = EngagementFilter {
            platform: Some(Platform::Outreach),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&records, &InternalOrg::default())), ["2"]);
    }

    #[test]
    fn participant_filter_requires_internal_match() {
        let records = fixture();
        let org = InternalOrg::default();
        let filter = EngagementFilter {
            participant: Some("Rep One".into()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&records, &org)), ["1", "3"]);

        let filter = EngagementFilter {
            participant: Some("Buyer".into()),
            ..Default::default()
        };
        assert!(filter.apply(&records, &org).is_empty());
    }

    #[test]
    fn opportunity_filters() {
        let records = fixture();
        let org = InternalOrg::default();
        let with = |opportunity| EngagementFilter {
            opportunity,
            ..Default::default()
        };
        assert_eq!(ids(&with(OpportunityFilter::Linked).apply(&records, &org)), ["1", "3"]);
        assert_eq!(ids(&with(OpportunityFilter::Unlinked).apply(&records, &org)), ["2"]);
        assert_eq!(
            ids(&with(OpportunityFilter::Named("Acme Expansion".into())).apply(&records, &org)),
            ["1"]
        );
        assert_eq!("has".parse::<OpportunityFilter>(), Ok(OpportunityFilter::Linked));
        assert_eq!(
            "Acme Expansion".parse::<OpportunityFilter>(),
            Ok(OpportunityFilter::Named("Acme Expansion".into()))
        );
    }

    #[test]
    fn search_matches_company_or_owner() {
        let records = fixture();
        let org = InternalOrg::default();
        let search = |term: &str| EngagementFilter {
            search: Some(term.into()),
            ..Default::default()
        };
        assert_eq!(ids(&search("GLOBEX").apply(&records, &org)), ["2"]);
        assert_eq!(ids(&search("rep.one").apply(&records, &org)), ["1", "3"]);
        assert_eq!(search("").apply(&records, &org).len(), 3);
    }

    #[test]
    fn opportunity_names_are_distinct_and_sorted() {
        assert_eq!(
            opportunity_names(&fixture()),
            ["Acme Expansion", "Initech New Logo"]
        );
    }

    #[test]
    fn pagination_arithmetic() {
        let page = paginate(32, Pagination { page: 3, per_page: 15 });
        assert_eq!(page.total_pages, 3);
        assert_eq!((page.start, page.end), (30, 32));
        assert_eq!(page.showing(), Some((31, 32)));
        assert!(page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn page_past_end_resets_to_first() {
        let page = paginate(10, Pagination { page: 4, per_page: 5 });
        assert_eq!(page.number, 1);
        assert_eq!((page.start, page.end), (0, 5));
    }

    #[test]
    fn empty_list_has_one_page() {
        let page = paginate(0, Pagination::default());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.showing(), None);
        assert!(page.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn slice_follows_bounds() {
        let items: Vec<u32> = (0..12).collect();
        let page = paginate(items.len(), Pagination { page: 2, per_page: 5 });
        assert_eq!(page.slice(&items), &[5, 6, 7, 8, 9]);
    }
}
