//! Headless-browser rendering for pages that need script execution.
//!
//! One WebDriver session is opened per collection run and shared by every
//! HTML fetch that needs it. The session is closed explicitly at the end of
//! the run through [`ScriptRenderer::close`].

use crate::error::{FetchError, HarvestError};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::{ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Renders a URL and returns the resulting page source.
#[async_trait]
pub trait ScriptRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;

    /// Release the underlying session. Later renders fail.
    async fn close(&self);
}

/// Chrome over WebDriver (e.g. a local `chromedriver --port=4444`).
pub struct WebDriverRenderer {
    driver: Mutex<Option<WebDriver>>,
    settle: Duration,
}

impl WebDriverRenderer {
    /// Start a headless Chrome session at `webdriver_url`.
    pub async fn connect(webdriver_url: &str, settle: Duration) -> Result<Self, HarvestError> {
        let unavailable = |reason: String| HarvestError::BrowserUnavailable {
            url: webdriver_url.to_string(),
            reason,
        };

        let mut caps = DesiredCapabilities::chrome();
        for arg in ["--headless", "--disable-gpu", "--no-sandbox"] {
            caps.add_arg(arg).map_err(|e| unavailable(e.to_string()))?;
        }

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        info!("Headless browser session started at {}", webdriver_url);

        Ok(Self {
            driver: Mutex::new(Some(driver)),
            settle,
        })
    }
}

#[async_trait]
impl ScriptRenderer for WebDriverRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let browser_err = |detail: String| FetchError::Browser {
            url: url.to_string(),
            detail,
        };

        let guard = self.driver.lock().await;
        let driver = guard
            .as_ref()
            .ok_or_else(|| browser_err("browser session already closed".into()))?;

        driver.goto(url).await.map_err(|e| browser_err(e.to_string()))?;
        tokio::time::sleep(self.settle).await;
        let source = driver.source().await.map_err(|e| browser_err(e.to_string()))?;
        debug!("Rendered {} ({} bytes)", url, source.len());
        Ok(source)
    }

    async fn close(&self) {
        if let Some(driver) = self.driver.lock().await.take() {
            match driver.quit().await {
                Ok(()) => info!("Headless browser session closed"),
                Err(e) => warn!("Failed to close browser session: {}", e),
            }
        }
    }
}
