use crate::config::AppConfig;
use crate::converter;
use crate::downloader::{self, DownloadRequest};
use crate::locator;
use crate::models::RunOutcome;
use anyhow::Context;
use browser::BrowserSession;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub dir: PathBuf,
    pub downloaded: Option<PathBuf>,
    pub renamed: Option<PathBuf>,
    pub outcome: RunOutcome,
}

/// Download, locate/rename, convert. Browser and locate failures are errors;
/// a missing file or a failed conversion is reported in the outcome.
pub async fn run<S: BrowserSession>(config: &AppConfig, session: S) -> anyhow::Result<PipelineSummary> {
    let dir = config.workspace_dir();
    let request = DownloadRequest::from_config(config);

    info!("Starting download phase...");
    let downloaded = downloader::trigger_download(session, &request, &dir)
        .await
        .context("download")?;
    info!("Download complete.");

    let mut summary = process_at(config, &Local::now())?;
    summary.downloaded = Some(downloaded);
    Ok(summary)
}

/// Locate/rename and convert only, against whatever is already in the directory.
pub fn process(config: &AppConfig) -> anyhow::Result<PipelineSummary> {
    process_at(config, &Local::now())
}

pub fn process_at(config: &AppConfig, now: &DateTime<Local>) -> anyhow::Result<PipelineSummary> {
    let dir = config.workspace_dir();

    info!("Starting locate phase...");
    let renamed = locator::locate_and_rename_at(&dir, &config.locate.pattern, now)
        .context("locate")?;

    let outcome = match &renamed {
        None => {
            warn!("No file to convert; skipping conversion.");
            RunOutcome::NoFile
        }
        Some(path) => {
            info!("Starting conversion phase...");
            convert_outcome(path, &locator::output_path(&dir, now))
        }
    };

    Ok(PipelineSummary {
        dir,
        downloaded: None,
        renamed,
        outcome,
    })
}

pub fn convert_outcome(src: &Path, dest: &Path) -> RunOutcome {
    match converter::convert_logged(src, dest) {
        Ok(report) => RunOutcome::Converted(report),
        Err(e) => RunOutcome::ConversionFailed {
            source: src.to_path_buf(),
            reason: e.to_string(),
        },
    }
}
