//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use callsight_core::filter::{DEFAULT_PAGE_SIZE, PAGE_SIZES};
use callsight_core::qualification::DEFAULT_TRUNCATION_LIMIT;
use callsight_core::{EngagementFilter, InternalOrg, OpportunityFilter, ParserConfig, Platform};
use callsight_sync::{
    CachedSource, DEFAULT_CACHE_TTL, DiskCache, FeedClient, FileSource, RecordSource,
};
use clap::Args;

const DEFAULT_CRM_URL: &str = "https://snaplogic.lightning.force.com/lightning/r/Opportunity";

pub type Source = CachedSource<Box<dyn RecordSource>>;

/// Where the feed comes from and how it is interpreted.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Engagement feed endpoint.
    #[arg(long, env = "CALLSIGHT_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// Bearer token for the feed endpoint.
    #[arg(long, env = "CALLSIGHT_FEED_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Read a saved response body instead of calling the feed.
    #[arg(long, global = true)]
    pub input: Option<PathBuf>,

    /// Directory for the cached feed response.
    #[arg(long, env = "CALLSIGHT_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a fetched feed stays fresh.
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs(), global = true)]
    pub cache_ttl: u64,

    /// Never read or write the on-disk cache.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Discard any cached feed before fetching.
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Exact qualification length that marks upstream truncation (0 disables recovery).
    #[arg(
        long,
        env = "CALLSIGHT_TRUNCATION_LIMIT",
        default_value_t = DEFAULT_TRUNCATION_LIMIT,
        global = true
    )]
    pub truncation_limit: usize,

    /// Company name identifying internal participants.
    #[arg(long, env = "CALLSIGHT_INTERNAL_ORG", default_value = "SnapLogic", global = true)]
    pub internal_org: String,

    /// Email domain identifying internal participants.
    #[arg(long, env = "CALLSIGHT_INTERNAL_DOMAIN", default_value = "snaplogic.com", global = true)]
    pub internal_domain: String,

    /// Base URL for opportunity links; `/<opp_id>/view` is appended.
    #[arg(long, env = "CALLSIGHT_CRM_URL", default_value = DEFAULT_CRM_URL, global = true)]
    pub crm_url: String,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// List filters shared by `list` and `browse`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Only this platform (outreach or chorus).
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Only engagements with this internal participant.
    #[arg(long)]
    pub participant: Option<String>,

    /// any, linked, unlinked, or an exact opportunity name.
    #[arg(long, default_value = "any")]
    pub opportunity: OpportunityFilter,

    /// Case-insensitive match on company or owner.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Engagements per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    pub per_page: usize,
}

impl FilterArgs {
    pub fn filter(&self) -> EngagementFilter {
        EngagementFilter {
            platform: self.platform,
            participant: self.participant.clone(),
            opportunity: self.opportunity.clone(),
            search: self.search.clone(),
        }
    }
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZES:?}"))
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub feed_url: Option<String>,
    pub token: Option<String>,
    pub input: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub refresh: bool,
    pub parser: ParserConfig,
    pub org: InternalOrg,
    pub crm_url: String,
}

impl Settings {
    pub fn from_args(args: &GlobalArgs) -> Self {
        let cache_dir = (!args.no_cache).then(|| {
            args.cache_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("callsight"))
        });
        Self {
            feed_url: args.feed_url.clone(),
            token: args.token.clone(),
            input: args.input.clone(),
            cache_dir,
            cache_ttl: Duration::from_secs(args.cache_ttl),
            refresh: args.refresh,
            parser: ParserConfig {
                truncation_limit: (args.truncation_limit > 0).then_some(args.truncation_limit),
            },
            org: InternalOrg {
                name: args.internal_org.clone(),
                email_domain: args.internal_domain.clone(),
            },
            crm_url: args.crm_url.clone(),
        }
    }

    /// Build the record source: a saved file, or the feed behind a TTL cache.
    pub async fn source(&self) -> anyhow::Result<Source> {
        if let Some(path) = &self.input {
            let file: Box<dyn RecordSource> = Box::new(FileSource::new(path));
            return Ok(CachedSource::new(file, self.cache_ttl));
        }

        let url = self.feed_url.clone().context(
            "no feed URL configured; pass --feed-url, set CALLSIGHT_FEED_URL, or use --input",
        )?;
        let client = FeedClient::new(url.clone(), self.token.clone())
            .context("building HTTP client")?;
        let boxed: Box<dyn RecordSource> = Box::new(client);
        let mut source = CachedSource::new(boxed, self.cache_ttl);
        if let Some(dir) = &self.cache_dir {
            source = source.with_disk(DiskCache::new(dir, &url, self.cache_ttl));
        }
        if self.refresh {
            source.invalidate().await.context("clearing feed cache")?;
        }
        Ok(source)
    }

    pub fn feed_client(&self) -> anyhow::Result<FeedClient> {
        let url = self
            .feed_url
            .clone()
            .context("no feed URL configured; pass --feed-url or set CALLSIGHT_FEED_URL")?;
        Ok(FeedClient::new(url, self.token.clone())?)
    }
}
