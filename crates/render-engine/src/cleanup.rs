//! Temp-file bookkeeping and best-effort deletion.
//!
//! Deletion failures never abort a synthesis; they are collected as
//! warnings next to the result instead.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// A non-fatal problem reported alongside a successful (or failed) synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisWarning {
    /// A temp file could not be deleted.
    Cleanup { path: PathBuf, error: String },
    /// Subtitles could not be burned in; the segment was kept without them.
    SubtitleBurnIn { segment: usize, diagnostic: String },
}

impl std::fmt::Display for SynthesisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisWarning::Cleanup { path, error } => {
                write!(f, "failed to remove {}: {error}", path.display())
            }
            SynthesisWarning::SubtitleBurnIn {
                segment,
                diagnostic,
            } => {
                // ffmpeg puts the actual error on its last stderr line.
                let last_line = diagnostic.lines().last().unwrap_or("").trim();
                write!(f, "segment {segment} kept without subtitles: {last_line}")
            }
        }
    }
}

/// Remove `path` if it exists; a failure becomes a warning.
pub fn remove_best_effort(path: &Path, warnings: &mut Vec<SynthesisWarning>) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed temporary file");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
            warnings.push(SynthesisWarning::Cleanup {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
        }
    }
}

/// Every temp path a synthesis may create, registered before it is written.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal; returns it for convenience.
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete everything registered, in registration order.
    pub fn cleanup(self) -> Vec<SynthesisWarning> {
        let mut warnings = Vec::new();
        for path in &self.paths {
            remove_best_effort(path, &mut warnings);
        }
        warnings
    }
}
