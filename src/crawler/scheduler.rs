//! Scheduler for managing the crawl frontier and admission
//!
//! This module handles:
//! - The unbounded frontier queue of pending tasks
//! - Global concurrency limiting via a semaphore (the admission gate)
//! - Detecting when no task is queued or running and none can appear again
//!
//! Every task is counted as pending from just before it is queued until the
//! worker that ran it lets go of its [`ScheduledTask`]. Workers push their
//! children while still holding their own task, so the count can only reach
//! zero once the whole traversal is done, and it never rises again after.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use url::Url;

/// A URL to crawl with its remaining depth budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Canonical URL (fragment stripped)
    pub url: Url,

    /// `-1` is unlimited, `0` is never fetched, `N > 0` allows N - 1 more hops
    pub depth: i32,
}

impl CrawlTask {
    pub fn new(url: Url, depth: i32) -> Self {
        Self { url, depth }
    }

    /// Returns true if this task fetches anything at all
    pub fn should_fetch(&self) -> bool {
        self.depth != 0
    }

    /// Returns true if links found on this page may be crawled
    pub fn follows_links(&self) -> bool {
        self.depth > 1 || self.depth == -1
    }

    /// Depth handed to tasks discovered on this page
    pub fn child_depth(&self) -> i32 {
        if self.depth == -1 {
            -1
        } else {
            self.depth - 1
        }
    }

    /// Creates the task for a link found on this page
    ///
    /// Returns `None` when this page has no budget left for another hop.
    pub fn child(&self, url: Url) -> Option<CrawlTask> {
        self.follows_links()
            .then(|| CrawlTask::new(url, self.child_depth()))
    }
}

struct FrontierState {
    tx: UnboundedSender<CrawlTask>,
    pending: AtomicUsize,
    drained: Notify,
}

/// Producer handle to the frontier, shared by the coordinator and workers
#[derive(Clone)]
pub struct Frontier {
    state: Arc<FrontierState>,
}

impl Frontier {
    /// Queues a task
    ///
    /// Returns false if the frontier has already been closed.
    pub fn push(&self, task: CrawlTask) -> bool {
        self.state.pending.fetch_add(1, Ordering::SeqCst);

        if self.state.tx.send(task).is_err() {
            self.release();
            return false;
        }

        true
    }

    /// Number of tasks queued or still running
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    fn release(&self) {
        if self.state.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.drained.notify_one();
        }
    }
}

/// Keeps a dispatched task counted as pending until dropped
struct InFlightGuard {
    frontier: Frontier,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.frontier.release();
    }
}

/// A dispatched task with its admission permit
///
/// Dropping it marks the task finished and frees its admission slot.
pub struct ScheduledTask {
    /// The task to run
    pub task: CrawlTask,

    /// The semaphore permit for this task, when concurrency is bounded
    _permit: Option<OwnedSemaphorePermit>,

    _guard: InFlightGuard,
}

/// Consumer side of the frontier
///
/// The scheduler coordinates:
/// - Global concurrency limits (max tasks running at once)
/// - Hand-off of queued tasks to the dispatch loop
/// - Closing the queue once the crawl is quiescent
pub struct Scheduler {
    rx: UnboundedReceiver<CrawlTask>,
    frontier: Frontier,

    /// Admission gate; `None` means unbounded
    gate: Option<Arc<Semaphore>>,
}

impl Scheduler {
    /// Creates a new scheduler and the frontier handle that feeds it
    ///
    /// # Arguments
    ///
    /// * `max_concurrency` - Maximum tasks running at once (0 means unbounded)
    pub fn new(max_concurrency: usize) -> (Self, Frontier) {
        let (tx, rx) = mpsc::unbounded_channel();
        let frontier = Frontier {
            state: Arc::new(FrontierState {
                tx,
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        };

        let gate = (max_concurrency > 0).then(|| Arc::new(Semaphore::new(max_concurrency)));

        let scheduler = Self {
            rx,
            frontier: frontier.clone(),
            gate,
        };
        (scheduler, frontier)
    }

    /// Gets the next task to run
    ///
    /// Waits for an admission permit when concurrency is bounded, then for a
    /// queued task. Back-pressure therefore lands on the caller (the dispatch
    /// loop), never on running workers. Cancelling the returned future loses
    /// no queued task.
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledTask)` - A task that may start now
    /// * `None` - Nothing is queued or running; the frontier is now closed
    pub async fn next(&mut self) -> Option<ScheduledTask> {
        let permit = match &self.gate {
            Some(gate) => Some(Arc::clone(gate).acquire_owned().await.ok()?),
            None => None,
        };

        let task = loop {
            if self.frontier.pending() == 0 {
                self.rx.close();
                tracing::debug!("Frontier drained, closing");
                return None;
            }

            tokio::select! {
                biased;
                task = self.rx.recv() => match task {
                    Some(task) => break task,
                    None => return None,
                },
                _ = self.frontier.state.drained.notified() => continue,
            }
        };

        tracing::trace!("Dispatching {} (depth {})", task.url, task.depth);
        Some(ScheduledTask {
            task,
            _permit: permit,
            _guard: InFlightGuard {
                frontier: self.frontier.clone(),
            },
        })
    }

    /// Number of free admission slots, or `None` if unbounded
    pub fn available_permits(&self) -> Option<usize> {
        self.gate.as_ref().map(|g| g.available_permits())
    }
}
