/// Task state definitions for tracking crawl progress
///
/// Every crawl task moves through these states once, from the moment its
/// URL is accepted into the frontier until its worker returns.
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Accepted into the frontier, waiting for dispatch
    Enqueued,

    /// Handed to a worker (holding an admission permit, if bounded)
    Dispatched,

    /// Request sent, response not yet classified
    Fetching,

    /// Response received, media type being inspected
    Classifying,

    /// HTML being decoded and run through the extractor
    Parsing,

    /// Body being written to disk
    Saving,

    /// Response was neither a page nor a wanted file; nothing left to do
    Ignored,

    // ===== Terminal State =====
    /// Worker finished (successfully or after a logged error)
    Finished,
}

impl TaskState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if the task holds a worker
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::Dispatched | Self::Fetching | Self::Classifying | Self::Parsing | Self::Saving
        )
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Any running state may end in `Finished` (errors end the task early),
    /// and so does `Ignored`.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        if (self.is_running() || *self == Ignored) && next == Finished {
            return true;
        }

        matches!(
            (self, next),
            (Enqueued, Dispatched)
                | (Dispatched, Fetching)
                | (Fetching, Classifying)
                | (Classifying, Parsing)
                | (Classifying, Saving)
                | (Classifying, Ignored)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Dispatched => "dispatched",
            Self::Fetching => "fetching",
            Self::Classifying => "classifying",
            Self::Parsing => "parsing",
            Self::Saving => "saving",
            Self::Finished => "finished",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one task's state and traces every change
#[derive(Debug)]
pub struct TaskProgress {
    url: String,
    state: TaskState,
}

impl TaskProgress {
    /// Starts tracking a task that has just been dispatched
    pub fn dispatched(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: TaskState::Dispatched,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Moves to `next`; an invalid move is logged and ignored
    pub fn advance(&mut self, next: TaskState) {
        if self.state.can_transition_to(next) {
            tracing::trace!("{}: {} -> {}", self.url, self.state, next);
            self.state = next;
        } else {
            tracing::warn!(
                "{}: ignoring invalid state change {} -> {}",
                self.url,
                self.state,
                next
            );
        }
    }

    /// Ends the task unless it already reached a terminal state
    pub fn finish(&mut self) {
        if !self.state.is_terminal() {
            self.advance(TaskState::Finished);
        }
    }
}
