//! Per-segment composition: one still image, one narration clip, an optional
//! presenter overlay, and optional burned-in subtitles.
//!
//! The narration length is authoritative. Every segment is encoded with the
//! same canvas, frame rate, and codec settings so the sequence can later be
//! joined with stream copy.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;

use slideweave_common::error::{SlideweaveError, SlideweaveResult};
use slideweave_project_model::{CompositionConfig, SegmentSpec};
use slideweave_subtitles::{build_drawtext_chain, parse_srt_file, resolve_subtitle_font};
use slideweave_subtitles::{FontSource, SubtitleEntry};
use slideweave_toolchain::{get_audio_duration, get_video_info, path_arg, MediaInfo, MediaToolchain};

use crate::cleanup::{remove_best_effort, SynthesisWarning};

/// Where a segment ended up in the encode -> burn-in pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SegmentStage {
    /// First pass only; no subtitles were requested.
    Encoded,
    /// Subtitles were burned in.
    Subtitled,
    /// The burn-in pass failed and the pre-subtitle encode was kept.
    SubtitleFailed { diagnostic: String },
}

impl SegmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStage::Encoded => "encoded",
            SegmentStage::Subtitled => "subtitled",
            SegmentStage::SubtitleFailed { .. } => "subtitle-failed",
        }
    }
}

/// A finished segment file.
#[derive(Debug, Clone)]
pub struct SegmentArtifact {
    /// 1-based position in the sequence.
    pub index: usize,
    pub path: PathBuf,
    /// Narration length in seconds.
    pub duration_secs: f64,
    pub stage: SegmentStage,
    /// Non-fatal problems hit while producing this segment.
    pub warnings: Vec<SynthesisWarning>,
}

/// Renders individual segments through a [`MediaToolchain`].
///
/// The subtitle font is resolved lazily on the first segment that needs one
/// and reused for the rest of the compositor's lifetime.
pub struct SegmentCompositor<'a> {
    toolchain: &'a dyn MediaToolchain,
    config: &'a CompositionConfig,
    font: OnceLock<FontSource>,
}

impl<'a> SegmentCompositor<'a> {
    pub fn new(toolchain: &'a dyn MediaToolchain, config: &'a CompositionConfig) -> Self {
        Self {
            toolchain,
            config,
            font: OnceLock::new(),
        }
    }

    /// Use `font` for burn-in instead of probing the system.
    pub fn with_font(self, font: FontSource) -> Self {
        // A fresh OnceLock cannot already be set.
        let _ = self.font.set(font);
        self
    }

    /// Compose a single segment into `output`.
    ///
    /// Standalone entry point; the artifact is reported as segment 1.
    pub fn process(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        video: Option<&Path>,
        subtitles: Option<&Path>,
    ) -> SlideweaveResult<SegmentArtifact> {
        let entries = subtitles.map(parse_srt_file).transpose()?;
        let mut spec = SegmentSpec::new(image, audio);
        spec.video_path = video.map(Path::to_path_buf);
        spec.subtitle_path = subtitles.map(Path::to_path_buf);
        self.process_parsed(1, &spec, entries.as_deref(), output)
    }

    /// Compose a segment whose subtitle file has already been parsed.
    pub fn process_parsed(
        &self,
        index: usize,
        spec: &SegmentSpec,
        subtitles: Option<&[SubtitleEntry]>,
        output: &Path,
    ) -> SlideweaveResult<SegmentArtifact> {
        let duration = get_audio_duration(self.toolchain, &spec.audio_path)?;
        tracing::info!(
            segment = index,
            image = %spec.image_path.display(),
            audio = %spec.audio_path.display(),
            presenter = spec.video_path.is_some(),
            duration_secs = duration,
            "Composing segment"
        );

        let subtitles = subtitles.filter(|entries| !entries.is_empty());
        if spec.subtitle_path.is_some() && subtitles.is_none() {
            tracing::debug!(segment = index, "Subtitle file has no entries, skipping burn-in");
        }
        let first_pass_target = match subtitles {
            Some(_) => staging_path(output),
            None => output.to_path_buf(),
        };

        let args = match &spec.video_path {
            None => still_image_args(
                &spec.image_path,
                &spec.audio_path,
                &first_pass_target,
                duration,
                self.config,
            ),
            Some(video) => {
                let presenter = get_video_info(self.toolchain, video)?;
                tracing::debug!(
                    segment = index,
                    width = presenter.width,
                    height = presenter.height,
                    presenter_secs = presenter.duration,
                    "Probed presenter clip"
                );
                presenter_args(
                    &spec.image_path,
                    video,
                    &spec.audio_path,
                    &first_pass_target,
                    duration,
                    &presenter,
                    self.config,
                )
            }
        };

        self.run_first_pass(index, &args, &first_pass_target)?;

        let mut warnings = Vec::new();
        let stage = match subtitles {
            None => SegmentStage::Encoded,
            Some(entries) => {
                self.burn_in(index, entries, &first_pass_target, output, &mut warnings)?
            }
        };

        tracing::info!(
            segment = index,
            output = %output.display(),
            stage = stage.as_str(),
            "Segment complete"
        );

        Ok(SegmentArtifact {
            index,
            path: output.to_path_buf(),
            duration_secs: duration,
            stage,
            warnings,
        })
    }

    fn font(&self) -> &FontSource {
        self.font
            .get_or_init(|| resolve_subtitle_font(self.toolchain))
    }

    fn run_first_pass(&self, index: usize, args: &[String], target: &Path) -> SlideweaveResult<()> {
        tracing::debug!(segment = index, args = ?args, "Running ffmpeg");
        let result = self.toolchain.encode(args)?;
        if result.success() {
            return Ok(());
        }

        tracing::error!(
            segment = index,
            status = %result.status_label(),
            stderr = %result.stderr.trim(),
            "Segment encode failed"
        );
        let mut ignored = Vec::new();
        remove_best_effort(target, &mut ignored);
        Err(SlideweaveError::encode(
            format!("Segment {index} encode failed ({})", result.status_label()),
            result.stderr,
        ))
    }

    /// Second pass. Never fails on the filter itself; only a failure to
    /// restore the pre-subtitle encode is an error.
    fn burn_in(
        &self,
        index: usize,
        entries: &[SubtitleEntry],
        staging: &Path,
        output: &Path,
        warnings: &mut Vec<SynthesisWarning>,
    ) -> SlideweaveResult<SegmentStage> {
        let font = self.font();
        let Some(chain) = build_drawtext_chain(entries, font, &self.config.subtitles) else {
            std::fs::rename(staging, output)?;
            return Ok(SegmentStage::Encoded);
        };

        let args = burn_in_args(staging, &chain, output, self.config);
        tracing::info!(
            segment = index,
            entries = entries.len(),
            font = %font.describe(),
            "Burning in subtitles"
        );
        tracing::debug!(segment = index, args = ?args, "Running ffmpeg");

        let failure = match self.toolchain.encode(&args) {
            Ok(result) if result.success() => None,
            Ok(result) => Some(format!("{}: {}", result.status_label(), result.stderr.trim())),
            Err(err) => Some(err.to_string()),
        };

        match failure {
            None => {
                remove_best_effort(staging, warnings);
                Ok(SegmentStage::Subtitled)
            }
            Some(diagnostic) => {
                tracing::warn!(
                    segment = index,
                    diagnostic = %diagnostic,
                    "Subtitle burn-in failed, keeping segment without subtitles"
                );
                remove_best_effort(output, warnings);
                std::fs::rename(staging, output)?;
                warnings.push(SynthesisWarning::SubtitleBurnIn {
                    segment: index,
                    diagnostic: diagnostic.clone(),
                });
                Ok(SegmentStage::SubtitleFailed { diagnostic })
            }
        }
    }
}

/// Where the first pass goes when a burn-in pass follows.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".presub.mp4");
    output.with_file_name(name)
}

fn format_duration(secs: f64) -> String {
    format!("{secs:.3}")
}

fn video_codec_args(config: &CompositionConfig) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        config.video.codec.clone(),
        "-preset".to_string(),
        config.video.preset.clone(),
        "-crf".to_string(),
        config.video.crf.to_string(),
    ]
}

fn audio_codec_args(config: &CompositionConfig) -> Vec<String> {
    vec![
        "-c:a".to_string(),
        config.audio.codec.clone(),
        "-b:a".to_string(),
        config.audio.bitrate.clone(),
    ]
}

/// Arguments for a still image over narration, no overlay.
pub fn still_image_args(
    image: &Path,
    audio: &Path,
    output: &Path,
    duration: f64,
    config: &CompositionConfig,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        path_arg(image),
        "-i".to_string(),
        path_arg(audio),
    ];
    args.extend(video_codec_args(config));
    args.extend(["-tune".to_string(), "stillimage".to_string()]);
    args.extend(audio_codec_args(config));
    args.extend([
        "-t".to_string(),
        format_duration(duration),
        "-pix_fmt".to_string(),
        config.video.pix_fmt.clone(),
        "-vf".to_string(),
        format!("scale={}:{},fps={}", config.width, config.height, config.fps),
        path_arg(output),
    ]);
    args
}

/// Filter graph compositing the keyed presenter over the looped image.
///
/// The presenter is trimmed to the narration length; a shorter clip is
/// held on its last frame until the narration ends.
pub fn presenter_filter_graph(
    duration: f64,
    presenter: &MediaInfo,
    config: &CompositionConfig,
) -> String {
    let pad = if presenter.duration > 0.0 && presenter.duration < duration {
        format!(
            ",tpad=stop_mode=clone:stop_duration={}",
            format_duration(duration - presenter.duration)
        )
    } else {
        String::new()
    };
    let margin = config.presenter.margin_px;

    [
        format!(
            "[0:v]loop=loop=-1:size=1:start=0,scale={}:{},setsar=1,fps={}[bg]",
            config.width, config.height, config.fps
        ),
        format!(
            "[1:v]{},trim=duration={},setpts=PTS-STARTPTS{pad},scale={}:-1[human]",
            config.presenter.chroma_key.filter(),
            format_duration(duration),
            config.presenter_width()
        ),
        format!("[bg][human]overlay=W-w-{margin}:H-h-{margin}[outv]"),
    ]
    .join(";")
}

/// Arguments for an image + presenter overlay + narration encode.
pub fn presenter_args(
    image: &Path,
    video: &Path,
    audio: &Path,
    output: &Path,
    duration: f64,
    presenter: &MediaInfo,
    config: &CompositionConfig,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        path_arg(image),
        "-i".to_string(),
        path_arg(video),
        "-i".to_string(),
        path_arg(audio),
        "-filter_complex".to_string(),
        presenter_filter_graph(duration, presenter, config),
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        "2:a".to_string(),
    ];
    args.extend(video_codec_args(config));
    args.extend(audio_codec_args(config));
    args.extend([
        "-t".to_string(),
        format_duration(duration),
        "-pix_fmt".to_string(),
        config.video.pix_fmt.clone(),
        path_arg(output),
    ]);
    args
}

/// Arguments for re-encoding video with a `drawtext` chain; audio is copied.
pub fn burn_in_args(
    input: &Path,
    chain: &str,
    output: &Path,
    config: &CompositionConfig,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(input),
        "-vf".to_string(),
        chain.to_string(),
    ];
    args.extend(video_codec_args(config));
    args.extend([
        "-c:a".to_string(),
        "copy".to_string(),
        path_arg(output),
    ]);
    args
}
