use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A file found in the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub mtime: SystemTime,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// How the locate/convert tail of a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    NoFile,
    Converted(ConversionReport),
    ConversionFailed { source: PathBuf, reason: String },
}

impl RunOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, RunOutcome::Converted(_))
    }
}
