//! Browser session abstraction used to trigger downloads.

use std::path::PathBuf;
use thiserror::Error;

pub mod chromium;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("devtools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("no link with text {0:?}")]
    LinkNotFound(String),
    #[error("no page open; navigate first")]
    NoPage,
    #[error("session already closed")]
    Closed,
}

/// Options for launching a browser that saves downloads without prompting.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub download_dir: PathBuf,
    pub headless: bool,
    pub no_sandbox: bool,
    pub executable: Option<PathBuf>,
}

impl LaunchOptions {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            headless: true,
            no_sandbox: false,
            executable: None,
        }
    }
}

/// A live browser session. Implementations own the underlying process; the
/// caller that owns the session is responsible for calling `close` once.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Clicks the first link whose trimmed visible text equals `text`.
    async fn click_link(&mut self, text: &str) -> Result<(), BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}
