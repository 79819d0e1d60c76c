//! Output module for saved files and crawl statistics
//!
//! This module handles:
//! - The per-host directory layout under the output root
//! - Writing files so that a partial write never shows up under its final name
//! - Counting what the crawl did and printing the summary

pub mod stats;

pub use stats::{print_statistics, CrawlStats, CrawlSummary};

use crate::{CrawlError, TaskError, TaskResult};
use std::io;
use std::path::{Path, PathBuf};

/// Root directory receiving one subdirectory per crawled host
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Creates the root directory (and any missing parents)
    ///
    /// # Returns
    ///
    /// * `Ok(OutputDir)` - The directory exists and is usable
    /// * `Err(CrawlError::OutputDir)` - It could not be created
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CrawlError::OutputDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Returns the directory for `host`, without touching the filesystem
    pub fn host_dir(&self, host: &str) -> PathBuf {
        self.root.join(host_dir_name(host))
    }

    /// Returns the directory for `host`, creating it if needed
    pub async fn ensure_host_dir(&self, host: &str) -> TaskResult<PathBuf> {
        let dir = self.host_dir(host);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| TaskError::Write {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Writes `bytes` as `name` inside the directory of `host`
    ///
    /// An existing file with the same name is replaced.
    pub async fn save(&self, host: &str, name: &str, bytes: &[u8]) -> TaskResult<PathBuf> {
        let path = self.ensure_host_dir(host).await?.join(name);
        write_atomic(&path, bytes)
            .await
            .map_err(|source| TaskError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Saved {}", path.display());
        Ok(path)
    }
}

/// Writes a file through a `.part` sibling that is renamed into place
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    if let Err(e) = tokio::fs::write(&part, bytes).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
    }

    tokio::fs::rename(&part, path).await
}

// IPv6 hosts carry brackets and colons, which are not portable in file names
fn host_dir_name(host: &str) -> String {
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    sanitize_filename::sanitize_with_options(
        trimmed.replace(':', "_"),
        sanitize_filename::Options {
            replacement: "_",
            ..Default::default()
        },
    )
}
