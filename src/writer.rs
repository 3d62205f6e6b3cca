//! Idempotent file output
//!
//! A file is only written when its bytes differ from what is on disk, so
//! regenerating unchanged output leaves modification times alone and does not
//! retrigger downstream watchers.
//!
//! In `WriteMode::Check` nothing is written; stale files are reported with a
//! unified diff instead.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use similar::TextDiff;
use tracing::debug;

use crate::error::{GenerateError, Result};

/// Whether outputs are written or only compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    Check,
}

/// Result of one idempotent write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content differed (or the file was missing) and was written
    Written,
    /// Existing content was byte-identical; file untouched
    Unchanged,
    /// Check mode: content differs from what is on disk
    Stale { diff: String },
}

/// A file scheduled for writing
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotentWriter {
    mode: WriteMode,
}

impl IdempotentWriter {
    pub fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Write `content` to `path` unless the file already holds exactly those bytes
    pub fn write_if_changed(&self, path: &Path, content: &str) -> Result<WriteOutcome> {
        let existing = match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(GenerateError::WriteFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if existing.as_deref() == Some(content.as_bytes()) {
            debug!(path = %path.display(), "Unchanged");
            return Ok(WriteOutcome::Unchanged);
        }

        match self.mode {
            WriteMode::Write => {
                fs::write(path, content).map_err(|source| GenerateError::WriteFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!(path = %path.display(), bytes = content.len(), "Written");
                Ok(WriteOutcome::Written)
            }
            WriteMode::Check => {
                let old = existing
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default();
                Ok(WriteOutcome::Stale {
                    diff: unified_diff(path, &old, content),
                })
            }
        }
    }

    /// Write a batch concurrently; outcomes keep the batch order.
    ///
    /// Every write is attempted before returning. The first error is reported and
    /// earlier successful writes are kept.
    pub fn write_batch(&self, writes: &[PendingWrite]) -> Result<Vec<(PathBuf, WriteOutcome)>> {
        let results: Vec<Result<(PathBuf, WriteOutcome)>> = writes
            .par_iter()
            .map(|w| {
                self.write_if_changed(&w.path, &w.content)
                    .map(|outcome| (w.path.clone(), outcome))
            })
            .collect();
        results.into_iter().collect()
    }
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let label = path.display().to_string();
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", label), &format!("b/{}", label))
        .to_string()
}
