//! Finds the most recently modified matching file and renames it with a timestamp.

use crate::models::Artifact;
use anyhow::Context;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const RENAMED_PREFIX: &str = "logs_";
pub const RENAMED_EXT: &str = "txt";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const OUTPUT_PREFIX: &str = "logs_output_";
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn build_matcher(pattern: &str) -> anyhow::Result<GlobMatcher> {
    let glob = Glob::new(pattern).with_context(|| format!("invalid file pattern {pattern:?}"))?;
    Ok(glob.compile_matcher())
}

/// Lists regular, non-hidden files directly inside `dir` whose name matches.
/// Symlinks are followed. A directory that does not exist yet has no candidates.
pub fn candidates(dir: &Path, matcher: &GlobMatcher) -> anyhow::Result<Vec<Artifact>> {
    if !dir.exists() {
        debug!("{} does not exist yet", dir.display());
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            // Broken symlink, or vanished between listing and stat.
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_hidden(name.to_str()) || !matcher.is_match(name) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        found.push(Artifact {
            path: entry.into_path(),
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
        });
    }
    Ok(found)
}

/// Picks the candidate with the latest modification time. Equal times are
/// broken by file name.
pub fn find_latest(dir: &Path, matcher: &GlobMatcher) -> anyhow::Result<Option<Artifact>> {
    let mut files = candidates(dir, matcher)?;
    files.sort_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| a.path.cmp(&b.path)));
    Ok(files.pop())
}

pub fn renamed_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}{}.{}",
        RENAMED_PREFIX,
        now.format(TIMESTAMP_FORMAT),
        RENAMED_EXT
    )
}

/// Returns the timestamp embedded in a name produced by [`renamed_file_name`].
pub fn parse_renamed_timestamp(name: &str) -> Option<NaiveDateTime> {
    let stamp = name
        .strip_prefix(RENAMED_PREFIX)?
        .strip_suffix(RENAMED_EXT)?
        .strip_suffix('.')?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

pub fn output_path<Tz: TimeZone>(dir: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!(
        "{}{}.xlsx",
        OUTPUT_PREFIX,
        now.format(OUTPUT_DATE_FORMAT)
    ))
}

/// Moves `path` to `logs_<timestamp>.txt` next to it and returns the new path.
pub fn rename_with_timestamp<Tz: TimeZone>(path: &Path, now: &DateTime<Tz>) -> anyhow::Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let target = dir.join(renamed_file_name(now));
    if target == path {
        return Ok(target);
    }
    if target.exists() {
        warn!("Replacing existing file {}", target.display());
    }
    fs::rename(path, &target)
        .with_context(|| format!("failed to rename {} to {}", path.display(), target.display()))?;
    Ok(target)
}

/// Locates the newest matching file in `dir` and renames it. `Ok(None)` means
/// nothing matched.
pub fn locate_and_rename(dir: &Path, pattern: &str) -> anyhow::Result<Option<PathBuf>> {
    locate_and_rename_at(dir, pattern, &Local::now())
}

pub fn locate_and_rename_at<Tz: TimeZone>(
    dir: &Path,
    pattern: &str,
    now: &DateTime<Tz>,
) -> anyhow::Result<Option<PathBuf>>
where
    Tz::Offset: std::fmt::Display,
{
    let matcher = build_matcher(pattern)?;
    let Some(latest) = find_latest(dir, &matcher)? else {
        warn!("No log files found in {}", dir.display());
        return Ok(None);
    };
    info!("Latest downloaded log file: {}", latest.path.display());
    let renamed = rename_with_timestamp(&latest.path, now)?;
    info!("Renamed to {}", renamed.display());
    Ok(Some(renamed))
}

fn is_hidden(name: Option<&str>) -> bool {
    name.map(|s| s.starts_with('.')).unwrap_or(false)
}
