//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet feed crawler.

use clap::{Args, Parser, Subcommand};
use driftnet::config::{load_config_with_hash, Config};
use driftnet::crawler::{CancelFlag, CrawlOrchestrator, CrawlSummary};
use driftnet::download::HttpDownloader;
use driftnet::pager::StopPolicy;
use driftnet::platform::{Platform, TargetKind};
use driftnet::source::{ApiFeedSource, ApiSourceConfig, EmbeddedMediaProvider};
use driftnet::store::JsonProgressStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Driftnet: a resumable social feed crawler
///
/// Driftnet pages through a platform feed, de-duplicates against previous
/// runs, collects item media, and appends every accepted item durably to a
/// per-target progress file. Interrupt it at any point and re-run with the
/// same arguments to continue where it stopped.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A resumable social feed crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a Twitter/X profile or hashtag feed
    Twitter(CrawlArgs),
    /// Crawl a Telegram channel
    Telegram(CrawlArgs),
    /// Crawl a TikTok profile or hashtag feed
    Tiktok(CrawlArgs),
    /// Crawl a Facebook page
    Facebook(CrawlArgs),
}

impl Command {
    fn platform(&self) -> Platform {
        match self {
            Self::Twitter(_) => Platform::Twitter,
            Self::Telegram(_) => Platform::Telegram,
            Self::Tiktok(_) => Platform::Tiktok,
            Self::Facebook(_) => Platform::Facebook,
        }
    }

    fn args(&self) -> &CrawlArgs {
        match self {
            Self::Twitter(a) | Self::Telegram(a) | Self::Tiktok(a) | Self::Facebook(a) => a,
        }
    }
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Target identifier (username, channel name, hashtag, or page name)
    target: String,

    /// Target kind (profile, hashtag, channel, page); platform default if omitted
    #[arg(long)]
    kind: Option<String>,

    /// Stop after this many newly accepted items
    #[arg(long)]
    limit: Option<u64>,

    /// Without --limit, stop after this many consecutive batches with no new items
    #[arg(long, value_name = "BATCHES", default_value_t = 3)]
    max_idle: u32,

    /// Skip downloading media files
    #[arg(long)]
    no_media: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(summary) => {
            println!("{}", summary);
            if summary.termination.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<CrawlSummary> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    let platform = cli.command.platform();
    let args = cli.command.args();
    let kind = resolve_kind(platform, args.kind.as_deref())?;

    let stop_policy = match args.limit {
        Some(limit) => StopPolicy::ByCount(limit),
        None => StopPolicy::ByNoNewContent(args.max_idle),
    };

    let mut source = build_source(&config, platform, &args.target)?;
    let mut provider = EmbeddedMediaProvider::new();

    let mut downloader = if config.storage.download_media && !args.no_media {
        Some(HttpDownloader::new(
            &config.storage.media_dir,
            &args.target,
            &config.user_agent_string(),
        )?)
    } else {
        None
    };

    let store = JsonProgressStore::new(&config.storage.progress_dir);
    let mut orchestrator = CrawlOrchestrator::new(store, stop_policy)
        .with_retry(config.retry_policy())
        .with_gallery_limits(config.gallery_limits())
        .with_corrupt_policy(config.crawl.on_corrupt_state)
        .with_cancel(spawn_ctrl_c_handler());

    let summary = orchestrator
        .run(
            &args.target,
            kind.as_str(),
            &mut source,
            &mut provider,
            downloader
                .as_mut()
                .map(|d| d as &mut dyn driftnet::source::Downloader),
        )
        .await?;
    Ok(summary)
}

/// Resolves the target kind, rejecting kinds the platform cannot crawl
fn resolve_kind(platform: Platform, kind: Option<&str>) -> anyhow::Result<TargetKind> {
    let kind = match kind {
        Some(k) => TargetKind::from_str(k).map_err(|e| anyhow::anyhow!(e))?,
        None => platform.default_kind(),
    };
    if !platform.supports(kind) {
        anyhow::bail!("{} does not support {} targets", platform, kind);
    }
    Ok(kind)
}

/// Builds the REST feed source from the platform's configured endpoint
fn build_source(
    config: &Config,
    platform: Platform,
    target: &str,
) -> anyhow::Result<ApiFeedSource> {
    let entry = config.platforms.get(&platform).ok_or_else(|| {
        anyhow::anyhow!("No [platforms.{}] section in the configuration", platform)
    })?;

    let source_config = ApiSourceConfig {
        endpoint: entry.endpoint.replace("{target}", target),
        bearer_token: entry.bearer_token.clone(),
        page_size: config.crawl.page_size,
        cursor_param: entry.cursor_param.clone(),
    };
    Ok(ApiFeedSource::new(
        source_config,
        &config.user_agent_string(),
    )?)
}

/// Cancels the run on the first Ctrl-C; a second Ctrl-C kills the process
fn spawn_ctrl_c_handler() -> CancelFlag {
    let flag = CancelFlag::new();
    let handler_flag = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current item");
            handler_flag.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    flag
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
