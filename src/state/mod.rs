//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: the lifecycle of a single crawl task
//! - `TaskProgress`: per-worker tracker that validates and traces changes

mod task_state;

pub use task_state::{TaskProgress, TaskState};
