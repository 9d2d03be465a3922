//! Scripted in-memory toolchain for exercising orchestration without ffmpeg.
//!
//! Probes are answered from tables. Encodes write a small text artifact to the
//! output path (the last argument) describing their inputs, burn-in passes
//! append a marker to their input's content, and concatenation joins the
//! listed artifacts in manifest order. This lets tests assert ordering and
//! fallback behaviour by reading the final file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use slideweave_common::error::{SlideweaveError, SlideweaveResult};

use crate::probe::MediaInfo;
use crate::{MediaToolchain, ToolOutput};

/// Marker appended by a successful burn-in pass.
pub const BURN_IN_MARKER: &str = "burn-in";

/// Which capability was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Probe,
    Encode,
    Concat,
    FontMatch,
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub kind: ToolKind,
    pub args: Vec<String>,
}

impl Invocation {
    /// Value following `flag`, if present.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        value_after(&self.args, flag)
    }

    /// All values following repeated `-i` flags.
    pub fn inputs(&self) -> Vec<&str> {
        inputs(&self.args)
    }

    /// The output path (last argument).
    pub fn output(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }

    /// Whether this is a subtitle burn-in pass.
    pub fn is_burn_in(&self) -> bool {
        self.kind == ToolKind::Encode
            && self
                .arg_after("-vf")
                .is_some_and(|vf| vf.contains("drawtext"))
    }
}

/// Mock [`MediaToolchain`] with scripted answers and failures.
#[derive(Debug)]
pub struct ScriptedToolchain {
    default_duration: f64,
    durations: HashMap<String, f64>,
    video_infos: HashMap<String, MediaInfo>,
    probe_overrides: Vec<(String, ToolOutput)>,
    encode_failures: Vec<(String, ToolOutput)>,
    concat_failure: Option<ToolOutput>,
    font_answer: Option<ToolOutput>,
    available: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl Default for ScriptedToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedToolchain {
    /// Every audio probe answers 3 seconds; every video probe 1280x720, 10s.
    pub fn new() -> Self {
        Self {
            default_duration: 3.0,
            durations: HashMap::new(),
            video_infos: HashMap::new(),
            probe_overrides: Vec::new(),
            encode_failures: Vec::new(),
            concat_failure: None,
            font_answer: None,
            available: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_duration(mut self, secs: f64) -> Self {
        self.default_duration = secs;
        self
    }

    /// Answer duration probes for `path` with `secs`.
    pub fn with_duration(mut self, path: impl AsRef<Path>, secs: f64) -> Self {
        self.durations
            .insert(path.as_ref().display().to_string(), secs);
        self
    }

    /// Answer stream probes for `path` with `info`.
    pub fn with_video_info(mut self, path: impl AsRef<Path>, info: MediaInfo) -> Self {
        self.video_infos
            .insert(path.as_ref().display().to_string(), info);
        self
    }

    /// Return `output` for any probe whose arguments mention `pattern`.
    pub fn probe_override(mut self, pattern: impl Into<String>, output: ToolOutput) -> Self {
        self.probe_overrides.push((pattern.into(), output));
        self
    }

    /// Shorthand for a probe override that fails.
    pub fn fail_probe_for(self, pattern: impl Into<String>, output: ToolOutput) -> Self {
        self.probe_override(pattern, output)
    }

    /// Fail any encode whose arguments mention `pattern`.
    pub fn fail_encode_when(mut self, pattern: impl Into<String>, stderr: &str) -> Self {
        self.encode_failures
            .push((pattern.into(), ToolOutput::failed(1, stderr)));
        self
    }

    /// Fail every subtitle burn-in pass.
    pub fn fail_burn_in(self, stderr: &str) -> Self {
        self.fail_encode_when("drawtext", stderr)
    }

    pub fn fail_concat(mut self, stderr: &str) -> Self {
        self.concat_failure = Some(ToolOutput::failed(1, stderr));
        self
    }

    /// Answer font-match queries with `output` (default: exit code 1).
    pub fn with_font_answer(mut self, output: ToolOutput) -> Self {
        self.font_answer = Some(output);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.lock_calls().clone()
    }

    /// Calls of one kind, in order.
    pub fn calls_of(&self, kind: ToolKind) -> Vec<Invocation> {
        self.lock_calls()
            .iter()
            .filter(|call| call.kind == kind)
            .cloned()
            .collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<Invocation>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, kind: ToolKind, args: &[String]) {
        self.lock_calls().push(Invocation {
            kind,
            args: args.to_vec(),
        });
    }

    fn answer_probe(&self, args: &[String]) -> ToolOutput {
        if let Some((_, output)) = self
            .probe_overrides
            .iter()
            .find(|(pattern, _)| mentions(args, pattern))
        {
            return output.clone();
        }

        let path = args.last().cloned().unwrap_or_default();
        if args.iter().any(|a| a == "format=duration") {
            let secs = self
                .durations
                .get(&path)
                .copied()
                .unwrap_or(self.default_duration);
            return ToolOutput::ok(format!("{secs:.6}\n"));
        }

        let info = self.video_infos.get(&path).copied().unwrap_or(MediaInfo {
            width: 1280,
            height: 720,
            duration: 10.0,
        });
        ToolOutput::ok(format!(
            "{{\"programs\":[],\"streams\":[{{\"width\":{},\"height\":{},\"duration\":\"{:.6}\"}}]}}",
            info.width, info.height, info.duration
        ))
    }

    fn answer_encode(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        if let Some((_, output)) = self
            .encode_failures
            .iter()
            .find(|(pattern, _)| mentions(args, pattern))
        {
            // ffmpeg may leave a truncated output behind.
            if let Some(out) = args.last() {
                std::fs::write(out, b"partial\n")?;
            }
            return Ok(output.clone());
        }

        let Some(out) = args.last() else {
            return Ok(ToolOutput::failed(1, "At least one output file must be specified"));
        };
        let sources = inputs(args);
        for source in &sources {
            if !Path::new(source).exists() {
                return Ok(ToolOutput::failed(
                    1,
                    format!("{source}: No such file or directory"),
                ));
            }
        }

        let burn_in = value_after(args, "-vf").is_some_and(|vf| vf.contains("drawtext"));
        let content = if burn_in {
            let base = sources
                .first()
                .map(std::fs::read_to_string)
                .transpose()?
                .unwrap_or_default();
            format!("{base}{BURN_IN_MARKER}\n")
        } else {
            format!("encode {}\n", sources.join(" "))
        };
        std::fs::write(out, content)?;
        Ok(ToolOutput::ok(""))
    }

    fn answer_concat(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        if let Some(output) = &self.concat_failure {
            return Ok(output.clone());
        }
        let (Some(list), Some(out)) = (value_after(args, "-i"), args.last()) else {
            return Ok(ToolOutput::failed(1, "missing concat list or output"));
        };

        let listing = std::fs::read_to_string(list)?;
        let mut joined = String::new();
        for entry in listing.lines().filter_map(parse_concat_line) {
            match std::fs::read_to_string(&entry) {
                Ok(content) => joined.push_str(&content),
                Err(_) => {
                    return Ok(ToolOutput::failed(
                        1,
                        format!("Impossible to open '{}'", entry.display()),
                    ))
                }
            }
        }
        std::fs::write(out, joined)?;
        Ok(ToolOutput::ok(""))
    }
}

impl MediaToolchain for ScriptedToolchain {
    fn probe(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.record(ToolKind::Probe, args);
        Ok(self.answer_probe(args))
    }

    fn encode(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.record(ToolKind::Encode, args);
        self.answer_encode(args)
    }

    fn concat(&self, args: &[String]) -> SlideweaveResult<ToolOutput> {
        self.record(ToolKind::Concat, args);
        self.answer_concat(args)
    }

    fn match_font(&self, args: &[String], _timeout: Duration) -> SlideweaveResult<ToolOutput> {
        self.record(ToolKind::FontMatch, args);
        match &self.font_answer {
            Some(output) => Ok(output.clone()),
            None => Err(SlideweaveError::toolchain("fc-match not scripted")),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn mentions(args: &[String], pattern: &str) -> bool {
    args.iter().any(|arg| arg.contains(pattern))
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(String::as_str)
}

fn inputs(args: &[String]) -> Vec<&str> {
    args.windows(2)
        .filter(|pair| pair[0] == "-i")
        .map(|pair| pair[1].as_str())
        .collect()
}

/// Parse one `file '<path>'` line of a concat listing.
fn parse_concat_line(line: &str) -> Option<PathBuf> {
    let quoted = line.trim().strip_prefix("file ")?;
    let inner = quoted.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(PathBuf::from(inner.replace("'\\''", "'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_writes_marker_artifact_and_records_call() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"png").unwrap();
        let out = dir.path().join("seg.mp4");

        let toolchain = ScriptedToolchain::new();
        let args = vec![
            "-i".to_string(),
            image.display().to_string(),
            out.display().to_string(),
        ];
        assert!(toolchain.encode(&args).unwrap().success());

        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(content, format!("encode {}\n", image.display()));
        let calls = toolchain.calls_of(ToolKind::Encode);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].inputs(), vec![image.display().to_string()]);
    }

    #[test]
    fn test_encode_of_missing_input_fails() {
        let toolchain = ScriptedToolchain::new();
        let args = vec![
            "-i".to_string(),
            "/nope/a.png".to_string(),
            "/tmp/unused.mp4".to_string(),
        ];
        let output = toolchain.encode(&args).unwrap();
        assert!(!output.success());
        assert!(output.stderr.contains("No such file"));
    }

    #[test]
    fn test_parse_concat_line_unescapes_quotes() {
        assert_eq!(
            parse_concat_line("file '/tmp/it'\\''s/segment_1.mp4'"),
            Some(PathBuf::from("/tmp/it's/segment_1.mp4"))
        );
        assert_eq!(parse_concat_line("# comment"), None);
    }

    #[test]
    fn test_font_match_unscripted_is_an_error() {
        let toolchain = ScriptedToolchain::new();
        assert!(toolchain
            .match_font(&[":lang=zh".to_string()], Duration::from_secs(1))
            .is_err());
        assert_eq!(toolchain.calls_of(ToolKind::FontMatch).len(), 1);
    }
}
