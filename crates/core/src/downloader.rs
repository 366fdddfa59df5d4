//! Drives a browser session to download the target file.

use crate::locator;
use crate::wait::{self, WaitConfig};
use browser::{BrowserError, BrowserSession};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("download did not finish: {0}")]
    Timeout(#[from] wait::TimedOut),
    #[error("cannot watch download directory: {0:#}")]
    Watch(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub link_text: String,
    pub pattern: String,
    pub wait: WaitConfig,
}

impl DownloadRequest {
    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        Self {
            url: cfg.download.url.clone(),
            link_text: cfg.download.link_text.clone(),
            pattern: cfg.locate.pattern.clone(),
            wait: WaitConfig {
                timeout: cfg.download.timeout(),
                poll_interval: cfg.download.poll_interval(),
            },
        }
    }
}

/// Opens the page, clicks the link and waits for the file to land in `dir`.
///
/// The session is consumed and closed exactly once, whatever the outcome.
pub async fn trigger_download<S: BrowserSession>(
    mut session: S,
    req: &DownloadRequest,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let result = drive(&mut session, req, dir).await;
    let closed = session.close().await;
    match (result, closed) {
        (Ok(path), Ok(())) => Ok(path),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Err(close_err)) => {
            warn!("closing browser after failure also failed: {}", close_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

async fn drive<S: BrowserSession>(
    session: &mut S,
    req: &DownloadRequest,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let matcher = locator::build_matcher(&req.pattern).map_err(DownloadError::Watch)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))
        .map_err(DownloadError::Watch)?;
    let before = wait::snapshot(dir, &matcher).map_err(DownloadError::Watch)?;

    session.navigate(&req.url).await?;
    session.click_link(&req.link_text).await?;
    info!("Clicked {:?}; waiting for download", req.link_text);

    let artifact = wait::wait_for_new_file(dir, &matcher, &before, req.wait).await?;
    info!(
        "Downloaded {} ({} bytes)",
        artifact.path.display(),
        artifact.size
    );
    Ok(artifact.path)
}
