//! Crawl statistics
//!
//! Counters are bumped by concurrent workers while the crawl runs and read
//! once at the end for the summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    pages_parsed: AtomicU64,
    links_enqueued: AtomicU64,
    resources_saved: AtomicU64,
    inline_assets_saved: AtomicU64,
    snapshots_saved: AtomicU64,
    failures: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn page_parsed(&self) {
        self.pages_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn link_enqueued(&self) {
        self.links_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resource_saved(&self) {
        self.resources_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inline_asset_saved(&self) {
        self.inline_assets_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_saved(&self) {
        self.snapshots_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error that was logged and skipped
    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters
    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_parsed: self.pages_parsed.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            resources_saved: self.resources_saved.load(Ordering::Relaxed),
            inline_assets_saved: self.inline_assets_saved.load(Ordering::Relaxed),
            snapshots_saved: self.snapshots_saved.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Responses received with status 200
    pub pages_fetched: u64,

    /// HTML pages run through the extractor
    pub pages_parsed: u64,

    /// Links handed to the frontier
    pub links_enqueued: u64,

    /// Files written from typed or octet-stream responses and page resources
    pub resources_saved: u64,

    /// Images decoded from `data:` URIs
    pub inline_assets_saved: u64,

    /// Full-page copies written
    pub snapshots_saved: u64,

    /// Errors logged and skipped
    pub failures: u64,
}

impl CrawlSummary {
    /// Total number of files written
    pub fn files_written(&self) -> u64 {
        self.resources_saved + self.inline_assets_saved + self.snapshots_saved
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The statistics to display
/// * `elapsed` - Wall-clock time of the crawl
pub fn print_statistics(summary: &CrawlSummary, elapsed: Duration) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Fetched: {}", summary.pages_fetched);
    println!("  Parsed: {}", summary.pages_parsed);
    println!("  Links enqueued: {}", summary.links_enqueued);
    println!();

    println!("Files ({}):", summary.files_written());
    println!("  Resources: {}", summary.resources_saved);
    println!("  Inline images: {}", summary.inline_assets_saved);
    println!("  Page copies: {}", summary.snapshots_saved);
    println!();

    if summary.failures > 0 {
        println!("Errors skipped: {}", summary.failures);
        println!();
    }

    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.pages_fetched as f64 / secs
    } else {
        0.0
    };
    println!("Elapsed: {:.1}s ({:.2} pages/sec)", secs, rate);
}
