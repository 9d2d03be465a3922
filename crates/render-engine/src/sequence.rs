//! Sequence synthesis: render every segment, then join them with stream copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use slideweave_common::config::AppConfig;
use slideweave_common::error::{SlideweaveError, SlideweaveResult};
use slideweave_project_model::{CompositionConfig, SegmentSpec};
use slideweave_subtitles::{parse_srt_file, FontSource, SubtitleEntry};
use slideweave_toolchain::{path_arg, MediaToolchain};

use crate::cleanup::{remove_best_effort, SynthesisWarning, TempFiles};
use crate::segment::{staging_path, SegmentArtifact, SegmentCompositor, SegmentStage};

/// Name of the concat demuxer listing inside the temp directory.
pub const CONCAT_LIST_NAME: &str = "concat_list.txt";

/// Knobs for a synthesis run.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Where segment artifacts go; defaults to a `temp` directory next to
    /// the output directory.
    pub temp_dir: Option<PathBuf>,

    /// Segments encoded at once. 1 means strictly sequential.
    pub parallelism: usize,

    pub composition: CompositionConfig,

    /// Subtitle font override; resolved from the system when `None`.
    pub font: Option<FontSource>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            temp_dir: None,
            parallelism: 1,
            composition: CompositionConfig::default(),
            font: None,
        }
    }
}

impl SynthesisOptions {
    /// Options seeded from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            parallelism: config.parallelism.max(1),
            ..Self::default()
        }
    }
}

/// Stages reported through [`ProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStage {
    Validating,
    Encoding,
    Concatenating,
    CleaningUp,
    Complete,
}

/// Progress report for a synthesis run.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisProgress {
    pub stage: SynthesisStage,
    /// Segments fully rendered so far.
    pub completed_segments: usize,
    pub total_segments: usize,
}

impl SynthesisProgress {
    /// Fraction of segments rendered, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_segments == 0 {
            return 0.0;
        }
        self.completed_segments as f64 / self.total_segments as f64
    }
}

pub type ProgressCallback = Box<dyn Fn(SynthesisProgress) + Send + Sync>;

/// What happened to one segment.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub index: usize,
    pub duration_secs: f64,
    pub stage: SegmentStage,
}

/// Result of a successful synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub output_path: PathBuf,
    pub segments: Vec<SegmentSummary>,
    /// Non-fatal problems: degraded subtitle passes and cleanup failures.
    pub warnings: Vec<SynthesisWarning>,
}

impl SynthesisReport {
    /// Sum of narration lengths, i.e. the expected output length.
    pub fn total_duration_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> SlideweaveResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Drives the segment compositor over a sequence and concatenates the result.
pub struct SequenceSynthesizer {
    toolchain: Arc<dyn MediaToolchain>,
    options: SynthesisOptions,
    progress: Option<ProgressCallback>,
}

impl SequenceSynthesizer {
    pub fn new(toolchain: Arc<dyn MediaToolchain>) -> Self {
        Self::with_options(toolchain, SynthesisOptions::default())
    }

    pub fn with_options(toolchain: Arc<dyn MediaToolchain>, options: SynthesisOptions) -> Self {
        Self {
            toolchain,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Render `segments` in order and join them into `output_path`.
    ///
    /// Temp artifacts and the concat listing are removed whether or not the
    /// run succeeds. `transition_duration` is accepted for compatibility and
    /// has no effect; segments are joined back to back.
    pub fn synthesize(
        &self,
        segments: &[SegmentSpec],
        output_path: &Path,
        transition_duration: f64,
    ) -> SlideweaveResult<SynthesisReport> {
        if segments.is_empty() {
            return Err(SlideweaveError::manifest("Sequence has no segments"));
        }
        if transition_duration != 0.0 {
            tracing::debug!(
                transition_duration,
                "Transitions are not applied, segments are joined back to back"
            );
        }

        let total = segments.len();
        tracing::info!(
            segments = total,
            output = %output_path.display(),
            toolchain = self.toolchain.name(),
            parallelism = self.options.parallelism,
            "Starting synthesis"
        );
        self.report(SynthesisStage::Validating, 0, total);

        let subtitles = load_inputs(segments)?;

        let (output_dir, temp_dir) = self.working_dirs(output_path);
        std::fs::create_dir_all(&output_dir)?;
        std::fs::create_dir_all(&temp_dir)?;

        let mut temp_files = TempFiles::new();
        let result = self.render(segments, &subtitles, output_path, &temp_dir, &mut temp_files);

        self.report(SynthesisStage::CleaningUp, total, total);
        let cleanup_warnings = temp_files.cleanup();

        let artifacts = match result {
            Ok(artifacts) => artifacts,
            Err(err) => {
                if !cleanup_warnings.is_empty() {
                    tracing::warn!(
                        count = cleanup_warnings.len(),
                        "Temporary files left behind after failed synthesis"
                    );
                }
                return Err(err);
            }
        };

        let mut warnings: Vec<SynthesisWarning> = artifacts
            .iter()
            .flat_map(|artifact| artifact.warnings.iter().cloned())
            .collect();
        warnings.extend(cleanup_warnings);

        let report = SynthesisReport {
            output_path: output_path.to_path_buf(),
            segments: artifacts
                .into_iter()
                .map(|artifact| SegmentSummary {
                    index: artifact.index,
                    duration_secs: artifact.duration_secs,
                    stage: artifact.stage,
                })
                .collect(),
            warnings,
        };

        self.report(SynthesisStage::Complete, total, total);
        tracing::info!(
            output = %report.output_path.display(),
            duration_secs = report.total_duration_secs(),
            warnings = report.warnings.len(),
            "Synthesis complete"
        );
        Ok(report)
    }

    fn report(&self, stage: SynthesisStage, completed: usize, total: usize) {
        if let Some(cb) = &self.progress {
            cb(SynthesisProgress {
                stage,
                completed_segments: completed,
                total_segments: total,
            });
        }
    }

    fn working_dirs(&self, output_path: &Path) -> (PathBuf, PathBuf) {
        let output_dir = non_empty_parent(output_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let temp_dir = self.options.temp_dir.clone().unwrap_or_else(|| {
            non_empty_parent(&output_dir)
                .unwrap_or(Path::new("."))
                .join("temp")
        });
        (output_dir, temp_dir)
    }

    fn render(
        &self,
        segments: &[SegmentSpec],
        subtitles: &[Option<Vec<SubtitleEntry>>],
        output_path: &Path,
        temp_dir: &Path,
        temp_files: &mut TempFiles,
    ) -> SlideweaveResult<Vec<SegmentArtifact>> {
        let mut compositor =
            SegmentCompositor::new(self.toolchain.as_ref(), &self.options.composition);
        if let Some(font) = &self.options.font {
            compositor = compositor.with_font(font.clone());
        }

        let planned: Vec<PathBuf> = (1..=segments.len())
            .map(|index| {
                let path = temp_files.register(temp_dir.join(format!("segment_{index}.mp4")));
                temp_files.register(staging_path(&path));
                path
            })
            .collect();

        let artifacts = if self.options.parallelism <= 1 {
            self.render_sequential(&compositor, segments, subtitles, &planned)?
        } else {
            self.render_parallel(&compositor, segments, subtitles, &planned)?
        };

        let list_path = temp_files.register(temp_dir.join(CONCAT_LIST_NAME));
        let artifact_paths: Vec<&Path> = artifacts.iter().map(|a| a.path.as_path()).collect();
        write_concat_list(&list_path, &artifact_paths)?;

        self.report(SynthesisStage::Concatenating, segments.len(), segments.len());
        self.concatenate(&list_path, output_path)?;
        Ok(artifacts)
    }

    fn render_sequential(
        &self,
        compositor: &SegmentCompositor<'_>,
        segments: &[SegmentSpec],
        subtitles: &[Option<Vec<SubtitleEntry>>],
        planned: &[PathBuf],
    ) -> SlideweaveResult<Vec<SegmentArtifact>> {
        let total = segments.len();
        let mut artifacts = Vec::with_capacity(total);
        for (i, spec) in segments.iter().enumerate() {
            self.report(SynthesisStage::Encoding, i, total);
            let artifact =
                compositor.process_parsed(i + 1, spec, subtitles[i].as_deref(), &planned[i])?;
            artifacts.push(artifact);
        }
        self.report(SynthesisStage::Encoding, total, total);
        Ok(artifacts)
    }

    /// Encode in batches of `parallelism`; results are collected in input
    /// order and the first failing batch stops the run.
    fn render_parallel(
        &self,
        compositor: &SegmentCompositor<'_>,
        segments: &[SegmentSpec],
        subtitles: &[Option<Vec<SubtitleEntry>>],
        planned: &[PathBuf],
    ) -> SlideweaveResult<Vec<SegmentArtifact>> {
        let total = segments.len();
        let jobs = self.options.parallelism;
        let mut artifacts = Vec::with_capacity(total);

        for batch_start in (0..total).step_by(jobs) {
            let batch_end = (batch_start + jobs).min(total);
            self.report(SynthesisStage::Encoding, batch_start, total);

            let results: Vec<SlideweaveResult<SegmentArtifact>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (batch_start..batch_end)
                    .map(|i| {
                        scope.spawn(move || {
                            compositor.process_parsed(
                                i + 1,
                                &segments[i],
                                subtitles[i].as_deref(),
                                &planned[i],
                            )
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle.join().unwrap_or_else(|_| {
                            Err(SlideweaveError::Other(anyhow::anyhow!(
                                "Segment worker panicked"
                            )))
                        })
                    })
                    .collect()
            });

            for result in results {
                artifacts.push(result?);
            }
        }

        self.report(SynthesisStage::Encoding, total, total);
        Ok(artifacts)
    }

    fn concatenate(&self, list_path: &Path, output_path: &Path) -> SlideweaveResult<()> {
        let args = concat_args(list_path, output_path);
        tracing::info!(output = %output_path.display(), "Concatenating segments");
        tracing::debug!(args = ?args, "Running ffmpeg");

        let result = self.toolchain.concat(&args)?;
        if result.success() {
            return Ok(());
        }

        tracing::error!(
            status = %result.status_label(),
            stderr = %result.stderr.trim(),
            "Concatenation failed"
        );
        let mut ignored = Vec::new();
        remove_best_effort(output_path, &mut ignored);
        Err(SlideweaveError::encode(
            format!("Concatenation failed ({})", result.status_label()),
            result.stderr,
        ))
    }
}

/// Check every input exists and parse every subtitle file before any encode.
fn load_inputs(segments: &[SegmentSpec]) -> SlideweaveResult<Vec<Option<Vec<SubtitleEntry>>>> {
    for (i, spec) in segments.iter().enumerate() {
        for (label, path) in spec.inputs() {
            if !path.exists() {
                tracing::error!(segment = i + 1, input = label, path = %path.display(), "Input file missing");
                return Err(SlideweaveError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        }
    }

    segments
        .iter()
        .map(|spec| spec.subtitle_path.as_deref().map(parse_srt_file).transpose())
        .collect()
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Quote a path for the concat demuxer: `'` closes, escapes, and reopens.
pub fn concat_entry(path: &Path) -> String {
    format!("file '{}'", path_arg(path).replace('\'', "'\\''"))
}

/// Write the concat listing with one absolute path per line, in order.
pub fn write_concat_list(list_path: &Path, artifacts: &[&Path]) -> SlideweaveResult<()> {
    let cwd = std::env::current_dir()?;
    let mut listing = String::new();
    for artifact in artifacts {
        let absolute = if artifact.is_absolute() {
            artifact.to_path_buf()
        } else {
            cwd.join(artifact)
        };
        listing.push_str(&concat_entry(&absolute));
        listing.push('\n');
    }
    std::fs::write(list_path, listing)?;
    tracing::debug!(path = %list_path.display(), entries = artifacts.len(), "Wrote concat list");
    Ok(())
}

/// Arguments for a stream-copy concatenation of `list_path` into `output`.
pub fn concat_args(list_path: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(list_path),
        "-c".to_string(),
        "copy".to_string(),
        path_arg(output),
    ]
}

/// Run [`SequenceSynthesizer::synthesize`] on the blocking thread pool.
pub async fn synthesize_async(
    synthesizer: Arc<SequenceSynthesizer>,
    segments: Vec<SegmentSpec>,
    output_path: PathBuf,
    transition_duration: f64,
) -> SlideweaveResult<SynthesisReport> {
    tokio::task::spawn_blocking(move || {
        synthesizer.synthesize(&segments, &output_path, transition_duration)
    })
    .await
    .map_err(|e| SlideweaveError::Other(anyhow::anyhow!("Synthesis task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_entry_escapes_single_quotes() {
        assert_eq!(
            concat_entry(Path::new("/tmp/it's/segment_1.mp4")),
            "file '/tmp/it'\\''s/segment_1.mp4'"
        );
    }

    #[test]
    fn test_concat_args() {
        let args = concat_args(Path::new("/t/concat_list.txt"), Path::new("/o/final.mp4"));
        assert_eq!(
            args.join(" "),
            "-y -f concat -safe 0 -i /t/concat_list.txt -c copy /o/final.mp4"
        );
    }

    #[test]
    fn test_concat_list_uses_absolute_paths_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join(CONCAT_LIST_NAME);
        let a = dir.path().join("segment_1.mp4");
        write_concat_list(&list, &[a.as_path(), Path::new("rel/segment_2.mp4")]).unwrap();

        let content = std::fs::read_to_string(&list).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("file '{}'", a.display()));
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            lines[1],
            format!("file '{}'", cwd.join("rel/segment_2.mp4").display())
        );
    }

    #[test]
    fn test_default_temp_dir_is_sibling_of_output_dir() {
        let synth = SequenceSynthesizer::new(Arc::new(
            slideweave_toolchain::mock::ScriptedToolchain::new(),
        ));
        let (output_dir, temp_dir) = synth.working_dirs(Path::new("/work/output/final.mp4"));
        assert_eq!(output_dir, PathBuf::from("/work/output"));
        assert_eq!(temp_dir, PathBuf::from("/work/temp"));

        let (output_dir, temp_dir) = synth.working_dirs(Path::new("final.mp4"));
        assert_eq!(output_dir, PathBuf::from("."));
        assert_eq!(temp_dir, PathBuf::from("./temp"));
    }

    #[test]
    fn test_configured_temp_dir_wins() {
        let options = SynthesisOptions {
            temp_dir: Some(PathBuf::from("/scratch")),
            ..SynthesisOptions::default()
        };
        let synth = SequenceSynthesizer::with_options(
            Arc::new(slideweave_toolchain::mock::ScriptedToolchain::new()),
            options,
        );
        let (_, temp_dir) = synth.working_dirs(Path::new("/work/output/final.mp4"));
        assert_eq!(temp_dir, PathBuf::from("/scratch"));
    }

    #[test]
    fn test_options_from_config() {
        let config = AppConfig {
            parallelism: 0,
            temp_dir: Some(PathBuf::from("/var/tmp/slideweave")),
            ..AppConfig::default()
        };
        let options = SynthesisOptions::from_config(&config);
        assert_eq!(options.parallelism, 1);
        assert_eq!(options.temp_dir, Some(PathBuf::from("/var/tmp/slideweave")));
    }

    #[test]
    fn test_report_serializes_stages_and_warnings() {
        let report = SynthesisReport {
            output_path: PathBuf::from("/o/final.mp4"),
            segments: vec![
                SegmentSummary {
                    index: 1,
                    duration_secs: 3.0,
                    stage: SegmentStage::Subtitled,
                },
                SegmentSummary {
                    index: 2,
                    duration_secs: 2.5,
                    stage: SegmentStage::SubtitleFailed {
                        diagnostic: "exit code 1".to_string(),
                    },
                },
            ],
            warnings: vec![SynthesisWarning::SubtitleBurnIn {
                segment: 2,
                diagnostic: "exit code 1".to_string(),
            }],
        };
        assert_eq!(report.total_duration_secs(), 5.5);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["segments"][0]["stage"]["stage"], "subtitled");
        assert_eq!(value["segments"][1]["stage"]["stage"], "subtitle_failed");
        assert_eq!(value["warnings"][0]["kind"], "subtitle_burn_in");
    }

    #[test]
    fn test_progress_fraction() {
        let progress = SynthesisProgress {
            stage: SynthesisStage::Encoding,
            completed_segments: 1,
            total_segments: 4,
        };
        assert_eq!(progress.fraction(), 0.25);
    }
}
