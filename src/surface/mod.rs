//! The meeting page as seen through a browser driver.
//!
//! Elements are addressed by XPath. Presence checks, the join flow and
//! teardown all go through [`SessionSurface`] so they can run against a fake
//! surface in tests.

pub mod webdriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use webdriver::WebDriverSurface;

/// How often `wait_for` re-checks the page.
const WAIT_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("browser driver request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no element matches {0}")]
    NoSuchElement(String),
    #[error("browser driver returned {status} {error}: {message}")]
    Driver {
        status: u16,
        error: String,
        message: String,
    },
    #[error("unexpected browser driver response: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait SessionSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError>;

    /// Whether an element matching `xpath` is currently on the page.
    async fn locate(&self, xpath: &str) -> Result<bool, SurfaceError>;

    async fn click(&self, xpath: &str) -> Result<(), SurfaceError>;

    async fn send_keys(&self, xpath: &str, text: &str) -> Result<(), SurfaceError>;

    /// Close the browser session. Later calls fail.
    async fn release(&self) -> Result<(), SurfaceError>;

    /// Poll `locate` until the element shows up or `timeout` passes.
    /// Lookup errors while waiting count as "not yet".
    async fn wait_for(&self, xpath: &str, timeout: Duration) -> Result<bool, SurfaceError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(true) = self.locate(xpath).await {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }
}
