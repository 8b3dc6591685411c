//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use leadsync_core::{SourceOutcome, SyncPipeline, SyncReport};
use leadsync_feeds::{FeedEndpoints, FeedOptions, HttpFeedClient};
use leadsync_sheets::GoogleSheet;
use leadsync_shared::{AppConfig, init_config, load_config, load_config_from, resolve_feed_token};
use tracing::{error, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadSync — pull website lead forms into the sales spreadsheet.
#[derive(Parser)]
#[command(
    name = "leadsync",
    version,
    about = "Sync Floor Plan and Show Guide form leads into the expo sales sheet.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.leadsync/leadsync.toml).
    #[arg(long, global = true, env = "LEADSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sync forever, pausing between runs. Run errors are logged, never fatal.
    Run {
        /// Override the configured pause between runs, in seconds.
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Perform a single sync and exit.
    Once,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadsync=info",
        1 => "leadsync=debug",
        _ => "leadsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init().await;
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run { interval_secs } => cmd_run(&config, interval_secs).await,
        Command::Once => cmd_once(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, interval_secs: Option<u64>) -> Result<()> {
    // A missing token would fail every cycle; refuse to start instead.
    resolve_feed_token(config)?;

    let interval_secs = interval_secs.unwrap_or(config.schedule.interval_secs);
    let pause = Duration::from_secs(interval_secs);
    info!(interval_secs, "starting sync loop");

    loop {
        info!("starting sync");
        tokio::select! {
            outcome = sync_cycle(config) => match outcome {
                Ok(report) => log_report(&report),
                Err(e) => error!(error = %e, "sync failed, will retry next cycle"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted during sync, stopping");
                return Ok(());
            }
        }

        info!(interval_secs, "sleeping until next sync");
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                return Ok(());
            }
        }
    }
}

async fn cmd_once(config: &AppConfig) -> Result<()> {
    let report = sync_cycle(config).await?;
    log_report(&report);

    // Print summary
    println!();
    println!("  Sync complete");
    println!("  Run:       {}", report.run_id);
    println!("  Existing:  {}", report.existing_emails);
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Processed { fetched, accepted } => {
                println!("  {:<10} {accepted} new of {fetched}", format!("{}:", source.source));
            }
            SourceOutcome::Skipped { reason } => {
                println!("  {:<10} skipped ({reason})", format!("{}:", source.source));
            }
        }
    }
    println!("  Inserted:  {}", report.inserted);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Connect to the feeds and the sheet, then run one sync.
///
/// Everything is rebuilt per cycle so a failure never leaks into the next run.
async fn sync_cycle(config: &AppConfig) -> leadsync_shared::Result<SyncReport> {
    let token = resolve_feed_token(config)?;
    let feeds = HttpFeedClient::new(
        FeedEndpoints::from_config(config)?,
        token,
        &FeedOptions::from(config),
    )?;
    let sheet = GoogleSheet::from_config(config).await?;

    SyncPipeline::new(sheet, feeds).run_once().await
}

fn log_report(report: &SyncReport) {
    let skipped = report
        .sources
        .iter()
        .filter(|s| matches!(s.outcome, SourceOutcome::Skipped { .. }))
        .count();
    info!(
        run_id = %report.run_id,
        existing = report.existing_emails,
        inserted = report.inserted,
        skipped_sources = skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "sync finished"
    );
}
