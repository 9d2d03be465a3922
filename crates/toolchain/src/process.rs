//! Process-backed toolchain: spawns the real ffmpeg, ffprobe, and fc-match.

use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use slideweave_common::config::ToolPaths;
use slideweave_common::error::{SlideweaveError, SlideweaveResult};

use crate::{MediaToolchain, ToolOutput};

const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Toolchain that runs external binaries and blocks until they exit.
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    tools: ToolPaths,
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCli {
    /// Use `ffmpeg`, `ffprobe`, and `fc-match` from `PATH`.
    pub fn new() -> Self {
        Self::with_tools(ToolPaths::default())
    }

    pub fn with_tools(tools: ToolPaths) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    fn run(&self, program: &str, args: &[String]) -> SlideweaveResult<ToolOutput> {
        tracing::debug!(program, args = ?args, "Running external tool");
        let started = Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SlideweaveError::toolchain(format!("Failed to start {program}: {e}")))?;

        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(
            program,
            status = ?result.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "External tool finished"
        );
        Ok(result)
    }

    fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> SlideweaveResult<ToolOutput> {
        tracing::debug!(program, args = ?args, timeout_ms = timeout.as_millis() as u64, "Running external tool");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlideweaveError::toolchain(format!("Failed to start {program}: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SlideweaveError::toolchain(format!("Failed to capture {program} stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlideweaveError::toolchain(format!("Failed to capture {program} stderr")))?;

        // Drain both pipes off-thread so the child never blocks on a full pipe.
        let stdout_task = std::thread::spawn(move || drain(stdout));
        let stderr_task = std::thread::spawn(move || drain(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() >= deadline => {
                    tracing::warn!(program, "External tool timed out, killing it");
                    child.kill().ok();
                    child.wait().ok();
                    break None;
                }
                Ok(None) => std::thread::sleep(TIMEOUT_POLL_INTERVAL),
                Err(e) => {
                    return Err(SlideweaveError::toolchain(format!(
                        "Failed to wait on {program}: {e}"
                    )))
                }
            }
        };

        let stdout = stdout_task
            .join()
            .unwrap_or_else(|_| format!("<failed to join {program} stdout reader>"));
        let stderr = stderr_task
            .join()
            .unwrap_or_else(|_| format!("<failed to join {program} stderr reader>"));

        Ok(ToolOutput {
            status: status.and_then(|s| s.code()),
            stdout,
            stderr,
        })
    }
}

fn drain(pipe: impl Read) -> String {
    let mut reader = BufReader::new(pipe);
    let mut bytes = Vec::new();
    match reader.read_to_end(&mut bytes) {
        Ok(_) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => format!("<failed to read pipe: {err}>"),
    }
}

impl MediaToolchain for FfmpegCli {
    fn probe(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.run(&self.tools.ffprobe, args)
    }

    fn encode(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.run(&self.tools.ffmpeg, args)
    }

    fn concat(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.run(&self.tools.ffmpeg, args)
    }

    fn match_font(&self, args: &[String], timeout: Duration) -> SlideweaveResult<ToolOutput> {
        self.run_with_timeout(&self.tools.fc_match, args, timeout)
    }

    fn is_available(&self) -> bool {
        binary_runs(&self.tools.ffmpeg) && binary_runs(&self.tools.ffprobe)
    }

    fn name(&self) -> &str {
        "ffmpeg-cli"
    }
}

/// Whether `binary -version` can be executed successfully.
pub fn binary_runs(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
