//! Review-Harvest main entry point
//!
//! This is the command-line interface for the Review-Harvest scraper.

use anyhow::{bail, Context};
use clap::Parser;
use review_harvest::config::{load_config_with_hash, Config};
use review_harvest::crawler::{JobOrchestrator, SearchPage, WorkItem};
use review_harvest::output::{print_statistics, HarvestSummary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Review-Harvest: a concurrent listing and review scraper
///
/// Review-Harvest fetches the search result pages of each keyword, writes
/// the listed products to one file per keyword, and then fetches every
/// product's review page into one file per product.
#[derive(Parser, Debug)]
#[command(name = "review-harvest")]
#[command(version)]
#[command(about = "A concurrent listing and review scraper", long_about = None)]
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

    /// Keyword to search for; repeat to search several (overrides the config)
    #[arg(short, long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,

    /// Search result pages per keyword (overrides the config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Only run the search jobs
    #[arg(long, conflicts_with = "details_from")]
    skip_details: bool,

    /// Run only the detail job, reading products from an existing search file
    #[arg(long, value_name = "FILE")]
    details_from: Option<PathBuf>,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let keywords = if cli.keywords.is_empty() {
        config.keywords.clone()
    } else {
        cli.keywords.clone()
    };
    let pages = cli.pages.unwrap_or(config.crawler.pages);

    if cli.dry_run {
        return handle_dry_run(&config, &keywords, pages);
    }

    let orchestrator = JobOrchestrator::from_config(config);

    let summary = match &cli.details_from {
        Some(path) => {
            let report = orchestrator
                .run_detail_job_from(path)
                .await
                .with_context(|| format!("Detail job for {} failed", path.display()))?;
            HarvestSummary {
                jobs: Vec::new(),
                detail_jobs: vec![report],
            }
        }
        None => {
            if keywords.is_empty() {
                bail!("No keywords given; set `keywords` in the config or pass --keyword");
            }
            orchestrator
                .harvest(&keywords, pages, !cli.skip_details)
                .await
                .context("Harvest failed")?
        }
    };

    if !cli.quiet {
        print_statistics(&summary);
    }

    let failures = summary.failure_count();
    if failures > 0 {
        bail!("{} items could not be processed", failures);
    }

    tracing::info!("Harvest completed successfully");
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvest=info,warn"),
            1 => EnvFilter::new("review_harvest=debug,info"),
            2 => EnvFilter::new("review_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the settings and the pages a run would fetch
fn handle_dry_run(config: &Config, keywords: &[String], pages: u32) -> anyhow::Result<()> {
    println!("=== Review-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Pages per keyword: {}", pages);
    println!("  Flush threshold: {}", config.crawler.flush_threshold);

    println!("\nTransport:");
    println!("  User agent: {}", config.transport.user_agent);
    println!("  Timeout: {}s", config.transport.timeout_secs);
    match &config.proxy {
        Some(proxy) => println!("  Proxy: {} ({})", proxy.endpoint, proxy.country),
        None => println!("  Proxy: none"),
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\nKeywords ({}):", keywords.len());
    for keyword in keywords {
        println!("  - {}", keyword);
        for index in 0..pages {
            let page = SearchPage::new(&config.site.search_url, keyword, index)?;
            println!("    * {}", page.locator());
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
