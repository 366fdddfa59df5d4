//! Condition-based waiting: poll a predicate until it holds or a timeout elapses.

use crate::locator;
use crate::models::Artifact;
use globset::GlobMatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("condition not met within {0:?}")]
pub struct TimedOut(pub Duration);

/// Calls `probe` every `poll_interval` until it yields a value. The probe
/// always runs at least once, and once more at the deadline.
pub async fn wait_until<T, F>(cfg: WaitConfig, mut probe: F) -> Result<T, TimedOut>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + cfg.timeout;
    loop {
        if let Some(value) = probe() {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(TimedOut(cfg.timeout));
        }
        sleep(cfg.poll_interval.min(deadline - now)).await;
    }
}

/// Matching files in `dir` keyed by path, used to tell new downloads from old files.
pub fn snapshot(dir: &Path, matcher: &GlobMatcher) -> anyhow::Result<HashMap<PathBuf, SystemTime>> {
    Ok(locator::candidates(dir, matcher)?
        .into_iter()
        .map(|a| (a.path, a.mtime))
        .collect())
}

/// Waits for a matching file that is absent from (or modified since) `before`
/// and whose size is unchanged across two consecutive polls.
pub async fn wait_for_new_file(
    dir: &Path,
    matcher: &GlobMatcher,
    before: &HashMap<PathBuf, SystemTime>,
    cfg: WaitConfig,
) -> Result<Artifact, TimedOut> {
    let mut last_seen: Option<(PathBuf, u64)> = None;
    wait_until(cfg, || {
        let fresh = locator::candidates(dir, matcher)
            .ok()?
            .into_iter()
            .filter(|a| before.get(&a.path).map_or(true, |old| *old != a.mtime))
            .max_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| a.path.cmp(&b.path)))?;
        let stable = matches!(&last_seen, Some((p, size)) if *p == fresh.path && *size == fresh.size);
        if stable {
            return Some(fresh);
        }
        debug!("download in progress: {} ({} bytes)", fresh.path.display(), fresh.size);
        last_seen = Some((fresh.path.clone(), fresh.size));
        None
    })
    .await
}
