//! Harvester main entry point
//!
//! This is the command-line interface for the Harvester resource crawler.

use anyhow::Context;
use clap::Parser;
use harvester::config::{resolve_config, split_file_types, Config, ConfigOverrides};
use harvester::output::print_statistics;
use harvester::{render, Coordinator, CrawlOutcome};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Exit code for a fatal error (bad configuration, unusable output directory)
const EXIT_FATAL: u8 = 2;

/// Exit code for a crawl stopped by Ctrl-C
const EXIT_INTERRUPTED: u8 = 3;

/// Harvester: a concurrent resource crawler
///
/// Harvester follows links from the given seed URLs up to a depth limit and
/// saves every resource whose file type is on the target list, one directory
/// per host.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version)]
#[command(about = "A concurrent resource crawler", long_about = None)]
struct Cli {
    /// Seed URLs to start from
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Crawl depth: -1 unlimited, 0 nothing, 1 the seeds only
    #[arg(long, allow_negative_numbers = true)]
    depth: Option<i32>,

    /// Maximum number of pages processed at once (0 means unbounded)
    #[arg(long = "max-con", value_name = "N")]
    max_concurrency: Option<usize>,

    /// Follow links to other hosts
    #[arg(long)]
    external: bool,

    /// Comma-separated file types to grab, e.g. jpg,png,pdf
    #[arg(long, value_name = "TYPES")]
    ftypes: Option<String>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Write log lines to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    log: Option<String>,

    /// Proxy URL, e.g. socks5://127.0.0.1:1080
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Render HTML pages with a headless browser
    #[arg(long)]
    headless: bool,

    /// Do not keep cookies between requests
    #[arg(long)]
    disable_cookie: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            depth: self.depth,
            max_concurrency: self.max_concurrency,
            external_webpages: self.external,
            file_types: self.ftypes.as_deref().map(split_file_types).unwrap_or_default(),
            dir: self.dir.clone(),
            log: self.log.clone(),
            proxy: self.proxy.clone(),
            headless: self.headless,
            disable_cookie: self.disable_cookie,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_hash) = match resolve_config(cli.config.as_deref(), &cli.overrides()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, config.output.log.as_deref()) {
        eprintln!("{:#}", e);
        return ExitCode::from(EXIT_FATAL);
    }

    if let (Some(path), Some(hash)) = (&cli.config, &config_hash) {
        tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            hash
        );
    }

    match handle_crawl(config, &cli.urls).await {
        Ok(CrawlOutcome::Completed) => ExitCode::SUCCESS,
        Ok(CrawlOutcome::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, urls: &[String]) -> anyhow::Result<CrawlOutcome> {
    if config.crawler.depth == 0 {
        tracing::info!("Depth is 0, nothing to crawl");
        return Ok(CrawlOutcome::Completed);
    }

    let renderer = render::launch(config.headless.enable)
        .await
        .context("Failed to start headless browser")?;

    let mut coordinator = match renderer {
        Some(renderer) => Coordinator::with_renderer(config, renderer)?,
        None => Coordinator::new(config)?,
    };

    coordinator.seed(urls);

    let started = Instant::now();
    let outcome = coordinator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    print_statistics(&coordinator.stats(), started.elapsed());

    Ok(outcome)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, formatted events are appended to it without colours.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("harvester=info,warn"),
            1 => EnvFilter::new("harvester=debug,info"),
            2 => EnvFilter::new("harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path}"))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }

    Ok(())
}
