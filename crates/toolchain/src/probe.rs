//! Media probing: narration duration and presenter stream geometry.
//!
//! Probing is deterministic, so failures are never retried; a failed probe
//! means the input is missing or unreadable.

use std::path::Path;

use serde::Deserialize;
use slideweave_common::error::{SlideweaveError, SlideweaveResult};

use crate::{path_arg, MediaToolchain};

/// Geometry and length of a video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Seconds; 0.0 when the container does not report a stream duration.
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeStreams {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: u32,
    height: u32,
    /// ffprobe reports durations as decimal strings.
    #[serde(default)]
    duration: Option<String>,
}

/// Argument vector for a container-duration query.
pub fn audio_duration_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path_arg(path),
    ]
}

/// Argument vector for a first-video-stream geometry query.
pub fn video_info_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=width,height,duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path_arg(path),
    ]
}

/// Duration of an audio file in seconds.
pub fn get_audio_duration(toolchain: &dyn MediaToolchain, path: &Path) -> SlideweaveResult<f64> {
    let output = toolchain.probe(&audio_duration_args(path))?;
    if !output.success() {
        return Err(SlideweaveError::probe(format!(
            "ffprobe failed for {} ({}): {}",
            path.display(),
            output.status_label(),
            output.stderr.trim()
        )));
    }

    let raw = output.stdout.trim();
    let duration = raw.parse::<f64>().map_err(|_| {
        SlideweaveError::probe(format!(
            "Unexpected ffprobe duration for {}: {raw:?}",
            path.display()
        ))
    })?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(SlideweaveError::probe(format!(
            "Invalid duration {duration} for {}",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), duration, "Probed audio duration");
    Ok(duration)
}

/// Width, height, and duration of the first video stream.
pub fn get_video_info(toolchain: &dyn MediaToolchain, path: &Path) -> SlideweaveResult<MediaInfo> {
    let output = toolchain.probe(&video_info_args(path))?;
    if !output.success() {
        return Err(SlideweaveError::probe(format!(
            "ffprobe failed for {} ({}): {}",
            path.display(),
            output.status_label(),
            output.stderr.trim()
        )));
    }

    let info = parse_video_info(&output.stdout).map_err(|message| {
        SlideweaveError::probe(format!("{message} for {}", path.display()))
    })?;
    tracing::debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        duration = info.duration,
        "Probed video stream"
    );
    Ok(info)
}

fn parse_video_info(json: &str) -> Result<MediaInfo, String> {
    let parsed: ProbeStreams =
        serde_json::from_str(json).map_err(|e| format!("Malformed ffprobe output ({e})"))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "No video stream reported".to_string())?;

    let duration = match stream.duration.as_deref() {
        None | Some("N/A") => 0.0,
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| format!("Unexpected stream duration {raw:?}"))?,
    };

    Ok(MediaInfo {
        width: stream.width,
        height: stream.height,
        duration,
    })
}
