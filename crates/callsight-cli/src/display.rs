//! Plain-text cards for engagements and their qualification summaries.
//!
//! Every renderer returns a `String` so the CLI and the browse session print
//! the same output, and so the layouts can be tested without a terminal.

use std::collections::BTreeMap;
use std::fmt::Write;

use callsight_core::diagnostics::{BodyReport, FeedStats, QualificationReport};
use callsight_core::{
    EngagementRecord, Line, Page, ParserConfig, ParticipantTally, Summary, summarize,
};

const LIST_DATE: &str = "%m/%d/%Y";
const DETAIL_DATE: &str = "%m/%d/%Y %H:%M";
const MAX_SUBJECT: usize = 80;
const MAX_LIST_ITEMS: usize = 10;

// ── Engagement list ──

/// One page of the filtered list, with its position header.
pub fn render_page(
    records: &[&EngagementRecord],
    page: &Page,
    config: &ParserConfig,
    selected: Option<&str>,
) -> String {
    let mut out = String::new();
    let Some((first, last)) = page.showing() else {
        out.push_str("No engagements match the current filters.\n");
        return out;
    };

    let _ = writeln!(
        out,
        "Showing {first}-{last} of {} engagements",
        page.total_records
    );
    let _ = writeln!(out, "Page {} of {}", page.number, page.total_pages);
    out.push('\n');

    for record in page.slice(records) {
        let marker = if selected == Some(record.id()) { ">" } else { " " };
        render_card(&mut out, marker, record, config);
    }
    out
}

fn render_card(out: &mut String, marker: &str, record: &EngagementRecord, config: &ParserConfig) {
    let mut heading = format!("{} - {}", record.company(), record.platform());
    if let Some(call_type) = record.call_type(config) {
        let _ = write!(heading, " - {call_type}");
    }
    let _ = writeln!(out, "{marker} {heading}");
    let _ = writeln!(out, "    {:<14} {}", "id", record.id());
    let _ = writeln!(out, "    {:<14} {}", "owner", record.owner_handle());
    let _ = writeln!(out, "    {:<14} {}", "date", format_date(record, LIST_DATE));
    if let Some(opp) = &record.opp_name {
        let _ = writeln!(out, "    {:<14} {}", "opportunity", opp);
    }
    if let Some(subject) = &record.subject {
        let _ = writeln!(out, "    {:<14} {}", "subject", truncate(subject, MAX_SUBJECT));
    }
    let links: Vec<&str> = [
        record.chorus_link.as_ref().map(|_| "recording"),
        record.pdf_tool_analysis_url.as_ref().map(|_| "analysis"),
        record.opp_id.as_ref().map(|_| "opportunity"),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !links.is_empty() {
        let _ = writeln!(out, "    {:<14} {}", "links", links.join(", "));
    }
    out.push('\n');
}

// ── Detail card ──

/// Full card for one engagement, followed by its qualification summary.
pub fn render_detail(record: &EngagementRecord, config: &ParserConfig, crm_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", record.company());
    if let Some(subject) = &record.subject {
        let _ = writeln!(out, "{subject}");
    }
    out.push('\n');

    out.push_str("Engagement\n");
    field(&mut out, "id", record.id());
    field(&mut out, "platform", record.platform().label());
    field(&mut out, "owner", record.owner());
    field(&mut out, "date", &format_date(record, DETAIL_DATE));
    if let Some(call_type) = record.call_type(config) {
        field(&mut out, "call type", &call_type);
    }
    if let Some(transcript) = &record.transcript {
        field(
            &mut out,
            "transcript",
            &format!("{} chars", transcript.chars().count()),
        );
    }
    out.push('\n');

    let participants = record.participants();
    if !participants.is_empty() {
        let _ = writeln!(out, "Participants ({})", participants.len());
        for p in participants.iter().take(MAX_LIST_ITEMS) {
            let name = p.name.as_deref().unwrap_or("-");
            let _ = write!(out, "  {name:<26}");
            if let Some(company) = &p.company_name {
                let _ = write!(out, " {company}");
            }
            if let Some(email) = &p.email {
                let _ = write!(out, " <{email}>");
            }
            out.push('\n');
        }
        if participants.len() > MAX_LIST_ITEMS {
            let _ = writeln!(out, "  ... and {} more", participants.len() - MAX_LIST_ITEMS);
        }
        out.push('\n');
    }

    let mut links = Vec::new();
    if let Some(url) = &record.chorus_link {
        links.push(("recording", url.clone()));
    }
    if let Some(url) = &record.pdf_tool_analysis_url {
        links.push(("analysis", url.clone()));
    }
    if let Some(url) = record.opportunity_url(crm_url) {
        let label = record.opp_name.as_deref().unwrap_or("opportunity");
        links.push(("opportunity", format!("{label} {url}")));
    }
    if !links.is_empty() {
        out.push_str("Quick Links\n");
        for (label, url) in &links {
            field(&mut out, label, url);
        }
        out.push('\n');
    }

    out.push_str("Qualification\n");
    let parsed = callsight_core::parse_qualification(&record.qualification_data, config);
    out.push_str(&render_summary(&summarize(parsed.as_ref())));
    out
}

/// The qualification summary as indented text.
pub fn render_summary(summary: &Summary) -> String {
    let sections = match summary {
        Summary::Unavailable => {
            return "  No qualification data available for this engagement.\n".into();
        }
        Summary::NotMeaningful => {
            return "  Qualification data was returned but contains no meaningful content.\n"
                .into();
        }
        Summary::Sections(sections) => sections,
    };

    let mut out = String::new();
    for section in sections {
        let _ = writeln!(out, "  -- {} --", section.title);
        for line in &section.lines {
            match line {
                Line::Field { label, value } => {
                    let _ = writeln!(out, "    {:<24} {}", format!("{label}:"), value);
                }
                Line::Heading(text) => {
                    let _ = writeln!(out, "    {text}:");
                }
                Line::Bullet(text) => {
                    let _ = writeln!(out, "      • {text}");
                }
                Line::SubBullet(text) => {
                    let _ = writeln!(out, "          - {text}");
                }
                Line::Caption(text) => {
                    let _ = writeln!(out, "    ({text})");
                }
                Line::Divider => out.push_str("    ---\n"),
            }
        }
        out.push('\n');
    }
    out
}

// ── Aggregates ──

pub fn render_participants(tallies: &BTreeMap<String, ParticipantTally>) -> String {
    if tallies.is_empty() {
        return "No internal participants found.\n".into();
    }
    let mut out = format!("=== Internal participants ({}) ===\n", tallies.len());
    for (name, tally) in tallies {
        let _ = write!(out, "  {name:<26} {:>4} calls", tally.count);
        if let Some(email) = &tally.email {
            let _ = write!(out, "  <{email}>");
        }
        out.push('\n');
    }
    out
}

pub fn render_opportunities(names: &[String], records: &[EngagementRecord]) -> String {
    if names.is_empty() {
        return "No linked opportunities.\n".into();
    }
    let mut out = format!("=== Opportunities ({}) ===\n", names.len());
    for name in names {
        let count = records
            .iter()
            .filter(|r| r.opp_name.as_deref() == Some(name.as_str()))
            .count();
        let _ = writeln!(out, "  {name:<40} {count:>4} calls");
    }
    out
}

// ── Diagnostics ──

pub fn render_body_report(report: &BodyReport) -> String {
    let mut out = String::from("Response body\n");
    field(&mut out, "bytes", &report.bytes.to_string());
    field(
        &mut out,
        "braces",
        &format!(
            "{} open / {} close ({:+})",
            report.open_braces,
            report.close_braces,
            report.brace_imbalance()
        ),
    );
    field(
        &mut out,
        "brackets",
        &format!(
            "{} open / {} close ({:+})",
            report.open_brackets,
            report.close_brackets,
            report.bracket_imbalance()
        ),
    );
    field(
        &mut out,
        "ends cleanly",
        if report.ends_cleanly { "yes" } else { "no" },
    );
    if !report.ends_cleanly {
        field(&mut out, "tail", &report.tail);
    }
    out.push('\n');
    out
}

/// Feed stats, then one row per report (only suspect ones unless `all`).
pub fn render_diagnosis(stats: &FeedStats, reports: &[QualificationReport], all: bool) -> String {
    let mut out = String::from("Qualification fields\n");
    field(&mut out, "records", &stats.records.to_string());
    field(
        &mut out,
        "with qualification",
        &stats.with_qualification.to_string(),
    );
    field(&mut out, "at truncation limit", &stats.at_limit.to_string());
    field(
        &mut out,
        "unterminated",
        &stats.looks_truncated.to_string(),
    );
    field(
        &mut out,
        "partially recovered",
        &stats.recovered_partially.to_string(),
    );
    field(&mut out, "unrecoverable", &stats.unrecoverable.to_string());
    out.push('\n');

    let shown: Vec<&QualificationReport> = reports
        .iter()
        .filter(|r| all || r.is_suspect())
        .collect();
    if shown.is_empty() {
        out.push_str("No suspect qualification payloads.\n");
        return out;
    }

    for r in shown {
        let chars = r.chars.map_or_else(|| "-".to_string(), |n| n.to_string());
        let mut flags = Vec::new();
        if r.at_limit {
            flags.push("at-limit");
        }
        if r.fenced {
            flags.push("fenced");
        }
        if r.looks_truncated {
            flags.push("unterminated");
        }
        let _ = writeln!(
            out,
            "  {:<20} {:<24} {:>6} chars  {:<14} {:>2} keys  {}",
            truncate(&r.engagement_id, 20),
            truncate(&r.company, 24),
            chars,
            format!("{:?}", r.stage),
            r.keys,
            flags.join(",")
        );
    }
    out
}

// ── Helpers ──

fn field(out: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {label:<26} {value}");
}

fn format_date(record: &EngagementRecord, fmt: &str) -> String {
    match record.created_at_utc() {
        Some(dt) => dt.format(fmt).to_string(),
        None => record.created_at.clone().unwrap_or_else(|| "-".into()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
