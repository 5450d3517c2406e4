//! Sumi-Spider main entry point
//!
//! This is the command-line interface for the Sumi-Spider recursive downloader.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_spider::config::{load_config_with_hash, validate, Config};
use sumi_spider::crawler::Crawler;
use sumi_spider::output::{print_report, write_markdown_report};
use sumi_spider::storage::open_store;
use tracing_subscriber::EnvFilter;

/// Exit status after an interrupt, matching the shell convention for SIGINT
const EXIT_INTERRUPTED: i32 = 130;

/// Sumi-Spider: a bounded-concurrency recursive web spider
///
/// Sumi-Spider downloads a page and everything it links to, down to a
/// maximum depth, with a cap on how many downloads run at once. Documents
/// already in the store are reused instead of fetched again.
#[derive(Parser, Debug)]
#[command(name = "sumi-spider")]
#[command(version)]
#[command(about = "A bounded-concurrency recursive web spider", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "ROOT_URL")]
    root_url: String,

    /// Number of link levels to download, counting the root as level one
    #[arg(value_name = "MAX_DEPTH")]
    max_depth: Option<u32>,

    /// Maximum number of pages processed at once
    #[arg(value_name = "CONCURRENCY")]
    concurrency: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write a markdown report to this path when the crawl finishes
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    // Positional arguments win over the file
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    validate(&config).context("Invalid configuration")?;

    let store = open_store(&config.output).context("Failed to open content store")?;
    let crawler = Crawler::from_config(&config, store)?;
    let max_depth = config.crawler.max_depth;

    tokio::select! {
        result = crawler.crawl(&cli.root_url, max_depth) => {
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("Crawl setup failed: {}", e);
                    return Err(e.into());
                }
            };

            print_report(&report);

            if let Some(path) = &cli.report {
                write_markdown_report(&report, config_hash.as_deref(), path)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                tracing::info!("Report written to {}", path.display());
            }

            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, abandoning in-flight downloads");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_spider=info,warn"),
            1 => EnvFilter::new("sumi_spider=debug,info"),
            2 => EnvFilter::new("sumi_spider=trace,debug"),
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
