use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use url::Url;

use super::{PageRenderer, RenderError};

/// Renders pages in a headless Chromium instance
///
/// One browser is shared by all workers; each render opens and closes its
/// own tab.
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeRenderer {
    /// Launches Chromium and starts its event handler task
    pub async fn launch() -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {:?}", e);
                }
            }
        });

        tracing::info!("Headless browser launched");
        Ok(Self { browser, handler })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<String, RenderError> {
        let load = async {
            let page = self
                .browser
                .new_page(url.as_str())
                .await
                .map_err(|e| RenderError::Browser(e.to_string()))?;

            let html = match page.wait_for_navigation().await {
                Ok(_) => page.content().await,
                Err(e) => Err(e),
            };
            let _ = page.close().await;

            html.map_err(|e| RenderError::Browser(e.to_string()))
        };

        tokio::time::timeout(timeout, load)
            .await
            .map_err(|_| RenderError::Timeout(timeout))?
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
