//! Optional headless-browser rendering of HTML pages
//!
//! When enabled, HTML pages are loaded in a real browser so that content
//! produced by scripts is present before extraction. The browser backend is
//! only compiled with the `headless` feature.

#[cfg(feature = "headless")]
mod chrome;

#[cfg(feature = "headless")]
pub use chrome::ChromeRenderer;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a page renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("headless rendering is not available in this build (enable the `headless` feature)")]
    Unavailable,

    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("page did not load within {0:?}")]
    Timeout(Duration),
}

/// Produces the rendered markup of a page
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url`, waits for navigation to settle and returns the DOM as HTML
    async fn render(&self, url: &Url, timeout: Duration) -> Result<String, RenderError>;
}

/// Starts the configured renderer, if any
///
/// Returns `Ok(None)` when headless rendering is disabled.
pub async fn launch(enabled: bool) -> Result<Option<Arc<dyn PageRenderer>>, RenderError> {
    if !enabled {
        return Ok(None);
    }

    #[cfg(feature = "headless")]
    {
        let renderer = ChromeRenderer::launch().await?;
        Ok(Some(Arc::new(renderer)))
    }

    #[cfg(not(feature = "headless"))]
    {
        Err(RenderError::Unavailable)
    }
}
