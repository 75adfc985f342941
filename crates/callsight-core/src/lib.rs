//! Core types for Callsight: engagement records, tolerant qualification parsing,
//! summary building, filtering, and feed diagnostics.

pub mod diagnostics;
mod error;
pub mod feed;
pub mod filter;
pub mod list;
pub mod partial;
pub mod qualification;
pub mod record;
pub mod summary;

pub use error::FeedError;
pub use feed::{decode_body, decode_feed};
pub use filter::{
    EngagementFilter, InternalOrg, OpportunityFilter, Page, Pagination, ParticipantTally,
};
pub use list::parse_list;
pub use partial::{PartialQualificationData, extract_partial};
pub use qualification::{
    KNOWN_FIELDS, ParseStage, ParserConfig, QualificationData, parse_qualification,
};
pub use record::{EngagementRecord, Participant, Platform};
pub use summary::{Line, Section, Summary, summarize};
