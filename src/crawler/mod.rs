//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with decompression
//! - Streaming HTML extraction of links and resources
//! - The frontier, its admission gate and quiescence detection
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod visited;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, decompress, FetchedResponse, Fetcher};
pub use parser::{extract_page, ExtractPolicy, Extraction, PageEvent};
pub use scheduler::{CrawlTask, Frontier, ScheduledTask, Scheduler};
pub use visited::VisitedSet;
