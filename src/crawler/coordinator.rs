//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the dispatch loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier through the visited set
//! - Spawning one worker per dispatched task
//! - Fetching, classifying, decoding and extracting pages
//! - Fetching and saving resources found on pages
//! - Handling interrupts

use crate::config::{validate, Config};
use crate::content::{
    classify, decode_page, disposition_filename, file_name_for, media_type_matches_extension,
    save_data_uri, snapshot_name, wants_full_html, ContentKind,
};
use crate::crawler::fetcher::{FetchedResponse, Fetcher};
use crate::crawler::parser::{extract_page, ExtractPolicy, PageEvent};
use crate::crawler::scheduler::{CrawlTask, Frontier, ScheduledTask, Scheduler};
use crate::crawler::visited::VisitedSet;
use crate::output::{CrawlStats, CrawlSummary, OutputDir};
use crate::render::PageRenderer;
use crate::state::{TaskProgress, TaskState};
use crate::url::{extract_host, match_extension, parse_seed};
use crate::{TaskError, TaskResult};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The frontier drained and every worker finished
    Completed,

    /// The shutdown signal fired first; running workers were aborted
    Interrupted,
}

/// Everything a worker needs, shared by all workers of one run
struct CrawlContext {
    fetcher: Fetcher,
    visited: VisitedSet,
    frontier: Frontier,
    output: OutputDir,
    stats: CrawlStats,
    renderer: Option<Arc<dyn PageRenderer>>,
    render_timeout: Duration,
    file_types: Vec<String>,
    external_webpages: bool,
    save_full_html: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    scheduler: Scheduler,
    depth: i32,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Output directory created, client ready
    /// * `Err(CrawlError)` - Invalid configuration, unusable output directory
    ///   or HTTP client failure
    pub fn new(config: Config) -> crate::Result<Self> {
        Self::build(config, None)
    }

    /// Creates a coordinator that renders HTML pages with `renderer`
    pub fn with_renderer(config: Config, renderer: Arc<dyn PageRenderer>) -> crate::Result<Self> {
        Self::build(config, Some(renderer))
    }

    fn build(config: Config, renderer: Option<Arc<dyn PageRenderer>>) -> crate::Result<Self> {
        validate(&config)?;

        let output = OutputDir::create(&config.output.dir)?;
        let fetcher = Fetcher::from_config(&config)?;
        let (scheduler, frontier) = Scheduler::new(config.crawler.max_concurrency);
        let save_full_html = wants_full_html(&config.crawler.file_types);

        if save_full_html {
            tracing::debug!("HTML is a target type; pages will be saved under their titles");
        }

        let ctx = CrawlContext {
            fetcher,
            visited: VisitedSet::new(),
            frontier,
            output,
            stats: CrawlStats::new(),
            renderer,
            render_timeout: Duration::from_secs(config.headless.timeout),
            file_types: config.crawler.file_types,
            external_webpages: config.crawler.external_webpages,
            save_full_html,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            scheduler,
            depth: config.crawler.depth,
        })
    }

    /// Queues the seed URLs at the configured depth
    ///
    /// Seeds that are not absolute `http`/`https` URLs are logged and skipped.
    /// Returns the number of seeds queued.
    pub fn seed<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queued = 0;

        for raw in urls {
            let raw = raw.as_ref();
            match parse_seed(raw) {
                Ok(url) => {
                    if self.ctx.enqueue(CrawlTask::new(url, self.depth)) {
                        queued += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping seed {:?}: {}", raw, e);
                    self.ctx.stats.failure();
                }
            }
        }

        tracing::debug!("Seeded {} URL(s) at depth {}", queued, self.depth);
        queued
    }

    /// Runs the dispatch loop until the frontier drains or `shutdown` fires
    ///
    /// On shutdown no further task is dispatched and running workers are
    /// aborted. Files are written through a temporary name, so an aborted
    /// write never leaves a truncated file behind under its final name.
    pub async fn run<F>(&mut self, shutdown: F) -> CrawlOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let started = Instant::now();
        let mut workers = JoinSet::new();

        tracing::info!("Starting crawl of {} seed(s)", self.ctx.frontier.pending());

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break CrawlOutcome::Interrupted,
                next = self.scheduler.next() => match next {
                    Some(scheduled) => {
                        workers.spawn(run_task(Arc::clone(&self.ctx), scheduled));
                    }
                    None => break CrawlOutcome::Completed,
                },
            }

            while let Some(result) = workers.try_join_next() {
                report_worker(result);
            }
        };

        if outcome == CrawlOutcome::Interrupted {
            tracing::warn!("Interrupted, aborting {} running task(s)", workers.len());
            workers.abort_all();
        }

        while let Some(result) = workers.join_next().await {
            report_worker(result);
        }

        tracing::info!(
            "Crawl {} after {:?}: {} URL(s) seen",
            match outcome {
                CrawlOutcome::Completed => "completed",
                CrawlOutcome::Interrupted => "interrupted",
            },
            started.elapsed(),
            self.ctx.visited.len()
        );

        outcome
    }

    /// Takes a snapshot of the run statistics
    pub fn stats(&self) -> CrawlSummary {
        self.ctx.stats.summary()
    }

    /// Number of distinct URLs accepted so far (pages and resources)
    pub fn visited_count(&self) -> usize {
        self.ctx.visited.len()
    }
}

async fn run_task(ctx: Arc<CrawlContext>, scheduled: ScheduledTask) {
    let task = &scheduled.task;
    let mut progress = TaskProgress::dispatched(task.url.as_str());

    if let Err(e) = ctx.crawl(task, &mut progress).await {
        tracing::warn!("{}", e);
        ctx.stats.failure();
    }

    progress.finish();
    // Dropping `scheduled` releases the admission slot and the pending count
}

fn report_worker(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Crawl worker panicked: {}", e);
        }
    }
}

impl CrawlContext {
    /// Accepts a task into the frontier unless its URL was seen before
    fn enqueue(&self, task: CrawlTask) -> bool {
        if !task.should_fetch() || !self.visited.mark(task.url.as_str()) {
            return false;
        }
        self.frontier.push(task)
    }

    async fn crawl(&self, task: &CrawlTask, progress: &mut TaskProgress) -> TaskResult<()> {
        progress.advance(TaskState::Fetching);

        if let Some(renderer) = &self.renderer {
            let is_html = self
                .fetcher
                .head_media_type(&task.url)
                .await?
                .is_some_and(|m| m.essence_str() == "text/html");

            if is_html {
                let html = renderer
                    .render(&task.url, self.render_timeout)
                    .await
                    .map_err(|source| TaskError::Render {
                        url: task.url.to_string(),
                        source,
                    })?;
                self.stats.page_fetched();
                progress.advance(TaskState::Classifying);
                progress.advance(TaskState::Parsing);
                return self.process_page(task, &html).await;
            }
        }

        let response = self.fetcher.fetch(&task.url).await?;
        self.stats.page_fetched();
        progress.advance(TaskState::Classifying);

        let media_type = response.media_type()?;
        let host = host_of(&task.url);

        match classify(media_type.essence_str(), &self.file_types) {
            ContentKind::HtmlPage => {
                progress.advance(TaskState::Parsing);
                let charset = media_type
                    .get_param(mime::CHARSET)
                    .map(|c| c.as_str().to_owned());
                let text = decode_page(task.url.as_str(), &response.body, charset.as_deref())?;
                self.process_page(task, &text).await
            }
            ContentKind::OctetStream => match self.attachment_name(&response) {
                Some(name) => {
                    progress.advance(TaskState::Saving);
                    self.save_download(&host, &name, &response).await
                }
                None => {
                    progress.advance(TaskState::Ignored);
                    tracing::debug!("{}: octet stream without a target file name", task.url);
                    Ok(())
                }
            },
            ContentKind::TypedResource(ext) => {
                progress.advance(TaskState::Saving);
                let name = file_name_for(task.url.path(), &ext);
                self.save_download(&host, &name, &response).await
            }
            ContentKind::Ignored => {
                progress.advance(TaskState::Ignored);
                tracing::debug!("{}: ignoring {}", task.url, media_type.essence_str());
                Ok(())
            }
        }
    }

    /// Applies everything found on a page, in document order
    async fn process_page(&self, task: &CrawlTask, text: &str) -> TaskResult<()> {
        let host = host_of(&task.url);
        let policy = ExtractPolicy {
            follow_links: task.follows_links(),
            external_webpages: self.external_webpages,
            file_types: &self.file_types,
            save_full_html: self.save_full_html,
        };

        let extraction = extract_page(text, &task.url, &policy);
        self.stats.page_parsed();

        if extraction.parse_errors > 0 {
            tracing::debug!("{}: {} markup error(s)", task.url, extraction.parse_errors);
        }

        for event in extraction.events {
            match event {
                PageEvent::Link(url) => {
                    let Some(child) = task.child(url) else {
                        continue;
                    };
                    let found = child.url.to_string();
                    if self.enqueue(child) {
                        tracing::info!("Found new url {:?} on {}", found, task.url);
                        self.stats.link_enqueued();
                    }
                }
                PageEvent::Resource { url, ext } => {
                    if !self.visited.mark(url.as_str()) {
                        continue;
                    }
                    if let Err(e) = self.fetch_resource(&host, &url, &ext).await {
                        tracing::warn!("{}", e);
                        self.stats.failure();
                    }
                }
                PageEvent::InlineAsset(uri) => {
                    if let Err(e) = self.save_inline(&host, &uri).await {
                        tracing::warn!("{}", e);
                        self.stats.failure();
                    }
                }
                PageEvent::Snapshot { title } => {
                    let name = snapshot_name(&title);
                    match self.output.save(&host, &name, text.as_bytes()).await {
                        Ok(_) => self.stats.snapshot_saved(),
                        Err(e) => {
                            tracing::warn!("{}", e);
                            self.stats.failure();
                        }
                    }
                }
                PageEvent::Diagnostic(message) => {
                    tracing::warn!("{} (on {})", message, task.url);
                    self.stats.failure();
                }
            }
        }

        Ok(())
    }

    /// Fetches a resource referenced by a page and saves it beside the page
    async fn fetch_resource(&self, host: &str, url: &Url, ext: &str) -> TaskResult<()> {
        let response = self.fetcher.fetch(url).await?;
        let name = file_name_for(url.path(), ext);
        tracing::info!("Found file {} on {}", name, url);

        let matches = response
            .media_type()
            .is_ok_and(|m| media_type_matches_extension(m.essence_str(), ext));
        if !matches {
            tracing::warn!(
                "URL: {}, MIME type in Content-Type mismatch file extension name",
                url
            );
        }

        self.output.save(host, &name, &response.body).await?;
        self.stats.resource_saved();
        Ok(())
    }

    async fn save_inline(&self, host: &str, uri: &str) -> TaskResult<()> {
        let dir = self.output.ensure_host_dir(host).await?;
        let path = save_data_uri(uri, &dir).await?;
        tracing::debug!("Saved inline image {}", path.display());
        self.stats.inline_asset_saved();
        Ok(())
    }

    async fn save_download(
        &self,
        host: &str,
        name: &str,
        response: &FetchedResponse,
    ) -> TaskResult<()> {
        tracing::info!("Found file {} on {}", name, response.url);
        self.output.save(host, name, &response.body).await?;
        self.stats.resource_saved();
        Ok(())
    }

    /// File name for an octet stream: the `Content-Disposition` name when it
    /// carries a target extension, else one derived from the URL path
    fn attachment_name(&self, response: &FetchedResponse) -> Option<String> {
        let disposed = response
            .content_disposition
            .as_deref()
            .and_then(disposition_filename)
            .filter(|name| match_extension(name, &self.file_types).is_some())
            .map(|name| sanitize_filename::sanitize(name))
            .filter(|name| !name.is_empty());

        if disposed.is_some() {
            return disposed;
        }

        let path = response.url.path();
        match_extension(path, &self.file_types).map(|found| file_name_for(path, &found.ext))
    }
}

fn host_of(url: &Url) -> String {
    extract_host(url).unwrap_or_default()
}
