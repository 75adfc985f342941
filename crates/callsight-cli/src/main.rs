mod browse;
mod config;
mod display;

use std::path::PathBuf;

use anyhow::{Context, bail};
use callsight_core::diagnostics::{BodyReport, FeedStats, inspect_records};
use callsight_core::filter::{Pagination, internal_participants, opportunity_names, paginate};
use callsight_core::{EngagementRecord, parse_qualification};
use callsight_sync::RecordSource;
use clap::{Parser, Subcommand};
use tracing::{Level, info};

use crate::browse::Session;
use crate::config::{FilterArgs, GlobalArgs, Settings};

#[derive(Parser)]
#[command(
    name = "callsight",
    version,
    about = "Browse recorded sales engagements and their qualification data"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List engagements, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one engagement with its qualification summary
    Show {
        /// Engagement ID
        id: String,

        /// Print the parsed qualification as JSON instead
        #[arg(long)]
        raw: bool,
    },
    /// Internal participants and how many calls they joined
    Participants,
    /// Linked opportunities
    Opportunities,
    /// Check the feed for truncated or unparseable payloads
    Diagnose {
        /// Report every record, not only suspect ones
        #[arg(long)]
        all: bool,
    },
    /// Save the raw feed response to a file
    Fetch {
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Interactive browsing session
    Browse {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.global.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_args(&cli.global);

    match cli.command {
        Command::List { filter, page } => {
            let source = settings.source().await?;
            let records = load_records(&source).await?;
            let matched = filter.filter().apply(&records, &settings.org);
            let page = paginate(
                matched.len(),
                Pagination {
                    page,
                    per_page: filter.per_page,
                },
            );
            print!(
                "{}",
                display::render_page(&matched, &page, &settings.parser, None)
            );
        }
        Command::Show { id, raw } => {
            let source = settings.source().await?;
            let records = load_records(&source).await?;
            let record = records
                .iter()
                .find(|r| r.id() == id)
                .with_context(|| format!("no engagement with id '{id}'"))?;
            if raw {
                let parsed = parse_qualification(&record.qualification_data, &settings.parser);
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                print!(
                    "{}",
                    display::render_detail(record, &settings.parser, &settings.crm_url)
                );
            }
        }
        Command::Participants => {
            let source = settings.source().await?;
            let records = load_records(&source).await?;
            let tallies = internal_participants(&records, &settings.org);
            print!("{}", display::render_participants(&tallies));
        }
        Command::Opportunities => {
            let source = settings.source().await?;
            let records = load_records(&source).await?;
            let names = opportunity_names(&records);
            print!("{}", display::render_opportunities(&names, &records));
        }
        Command::Diagnose { all } => {
            let source = settings.source().await?;
            let body = source.fetch_body().await.context("fetching feed")?;
            print!("{}", display::render_body_report(&BodyReport::inspect(&body)));

            let records = callsight_core::decode_feed(&body).context("decoding feed")?;
            let reports = inspect_records(&records, &settings.parser);
            let stats = FeedStats::collect(&reports);
            print!("{}", display::render_diagnosis(&stats, &reports, all));
        }
        Command::Fetch { output } => {
            let client = settings.feed_client()?;
            let body = client.fetch_body().await.context("fetching feed")?;
            std::fs::write(&output, &body)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(path = %output.display(), bytes = body.len(), "saved feed response");
        }
        Command::Browse { filter } => {
            let source = settings.source().await?;
            let session = Session {
                selected: None,
                pagination: Pagination {
                    page: 1,
                    per_page: filter.per_page,
                },
                filter: filter.filter(),
            };
            browse::run(&source, &settings, session).await?;
        }
    }

    Ok(())
}

/// Fetch and decode the feed. An empty feed is an error.
pub(crate) async fn load_records(
    source: &impl RecordSource,
) -> anyhow::Result<Vec<EngagementRecord>> {
    let records = source.fetch().await.context("fetching feed")?;
    if records.is_empty() {
        bail!("No data available. Please check the API connection.");
    }
    info!(records = records.len(), "loaded engagements");
    Ok(records)
}
