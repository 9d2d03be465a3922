//! SlideWeave Toolchain
//!
//! Every media transform is delegated to external processes. This crate
//! defines the capability seam those processes sit behind:
//!
//! - [`MediaToolchain`]: probe, encode, concat, and font-match operations
//! - [`FfmpegCli`]: the real implementation spawning `ffmpeg`/`ffprobe`/`fc-match`
//! - `mock::ScriptedToolchain`: an in-memory stand-in for tests, behind the
//!   `mock` feature
//! - [`probe`]: duration and stream-geometry queries built on top

use std::time::Duration;

use slideweave_common::error::SlideweaveResult;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod probe;
pub mod process;

pub use probe::{get_audio_duration, get_video_info, MediaInfo};
pub use process::FfmpegCli;

/// Captured result of one external process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal or timed out.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable exit status for error messages.
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => format!("exit code {code}"),
            None => "terminated without exit code".to_string(),
        }
    }
}

/// Capability interface over the external media toolchain.
///
/// Each operation receives the full argument vector (without the program
/// name) and blocks until the process exits. A process that runs and exits
/// non-zero is reported through [`ToolOutput::status`]; `Err` is reserved for
/// failing to run the process at all.
pub trait MediaToolchain: Send + Sync {
    /// Run the metadata prober (`ffprobe`).
    fn probe(&self, args: &[String]) -> SlideweaveResult<ToolOutput>;

    /// Run a filter/encode pass (`ffmpeg`).
    fn encode(&self, args: &[String]) -> SlideweaveResult<ToolOutput>;

    /// Run a stream-copy concatenation (`ffmpeg -f concat`).
    fn concat(&self, args: &[String]) -> SlideweaveResult<ToolOutput>;

    /// Run the font matcher (`fc-match`), giving up after `timeout`.
    fn match_font(&self, args: &[String], timeout: Duration) -> SlideweaveResult<ToolOutput>;

    /// Check if the encoder and prober are available on the system.
    fn is_available(&self) -> bool;

    /// Toolchain name.
    fn name(&self) -> &str;
}

/// Convert a path to an argument string.
pub fn path_arg(path: &std::path::Path) -> String {
    path.display().to_string()
}
