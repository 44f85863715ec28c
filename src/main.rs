//! Sumi-Sift main entry point
//!
//! This is the command-line interface for the Sumi-Sift keyword crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_sift::config::{load_config_with_hash, Config, FilterMode};
use sumi_sift::crawler::Coordinator;
use sumi_sift::enrich::ChatAnnotator;
use sumi_sift::fetch::HttpFetcher;
use sumi_sift::output::{print_report, print_snapshot, Exporter, RunInfo, RunStatus};
use tracing_subscriber::EnvFilter;

/// Sumi-Sift: a polite keyword-sifting web crawler
///
/// Sumi-Sift crawls outward from seed URLs up to a fixed depth, keeps the
/// pages that mention the configured keywords, and writes each kept page
/// once to CSV, JSON and SQLite outputs.
#[derive(Parser, Debug)]
#[command(name = "sumi-sift")]
#[command(version = "1.0.0")]
#[command(about = "A polite keyword-sifting web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Export every fetched page, recording matches without filtering
    #[arg(long)]
    passthrough: bool,

    /// Override the configured page limit
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.passthrough {
        config.crawler.filter_mode = FilterMode::Passthrough;
    }
    if cli.max_pages.is_some() {
        config.crawler.max_pages = cli.max_pages;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "sumi_sift=info,warn",
            1 => "sumi_sift=debug,info",
            2 => "sumi_sift=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config) {
    let settings = config.crawl_settings();

    println!("=== Sumi-Sift Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", settings.max_depth);
    println!("  Max concurrency: {}", settings.max_concurrency);
    match settings.max_pages {
        Some(n) => println!("  Max pages: {}", n),
        None => println!("  Max pages: unlimited"),
    }
    match settings.max_duration {
        Some(d) => println!("  Max duration: {}s", d.as_secs()),
        None => println!("  Max duration: unlimited"),
    }
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Filter mode: {}", settings.filter_mode.as_str());

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nScope:");
    match &settings.allowed_domain {
        Some(domain) => println!(
            "  Allowed domain: {} (subdomains: {})",
            domain, settings.include_subdomains
        ),
        None => println!("  Allowed domain: any"),
    }
    println!("  Denied extensions: {}", settings.denied_extensions.len());

    println!("\nSeeds ({}):", settings.seeds.len());
    for seed in &settings.seeds {
        println!("  - {}", seed);
    }

    println!("\nKeywords ({}):", settings.keywords.len());
    for term in &settings.keywords {
        println!("  - {}", term);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    for format in &config.output.formats {
        println!("  - {}", format.extension());
    }
    if config.enrichment.enabled {
        println!(
            "  Enrichment: {} via {}",
            config.enrichment.model, config.enrichment.endpoint
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        settings.seeds.len()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_config(&config).context("Failed to build HTTP client")?;

    let annotator = if config.enrichment.enabled {
        match ChatAnnotator::from_config(&config.enrichment) {
            Ok(annotator) => Some(annotator),
            Err(e) => {
                tracing::warn!("Enrichment disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let run = RunInfo::new(config_hash);
    let mut exporter = Exporter::from_config(&config.output, &run, annotator.is_some())
        .context("Failed to open output sinks")?;
    if let Some(annotator) = annotator {
        exporter = exporter.with_annotator(Arc::new(annotator));
    }

    let exporter = Arc::new(exporter);
    let mut coordinator =
        match Coordinator::new(config.crawl_settings(), Arc::new(fetcher), Arc::clone(&exporter)) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                // the sink files already exist; close them out as a failed run
                if let Err(finalize_err) = exporter.finalize_as(RunStatus::Failed).await {
                    tracing::error!("Failed to finalize output: {}", finalize_err);
                }
                return Err(e.into());
            }
        };

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            stop.request_stop();
        }
    });

    let stats = coordinator.stats();
    match coordinator.run().await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            print_snapshot(&stats.snapshot());
            Err(e.into())
        }
    }
}
