//! Segment descriptors and the sequence manifest.
//!
//! A sequence is an ordered list of segments; each segment pairs one still
//! image with one narration clip, optionally a green-screen presenter clip
//! and a subtitle file. Order in the list is order in the final video.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::composition::CompositionConfig;

/// Caller-supplied inputs for one output segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Background still image.
    pub image_path: PathBuf,

    /// Narration audio; its duration is the segment's duration.
    pub audio_path: PathBuf,

    /// Green-screen presenter clip composited bottom-right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,

    /// SRT subtitles, timed from the start of this segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<PathBuf>,
}

impl SegmentSpec {
    pub fn new(image_path: impl Into<PathBuf>, audio_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            audio_path: audio_path.into(),
            video_path: None,
            subtitle_path: None,
        }
    }

    pub fn with_presenter(mut self, video_path: impl Into<PathBuf>) -> Self {
        self.video_path = Some(video_path.into());
        self
    }

    pub fn with_subtitles(mut self, subtitle_path: impl Into<PathBuf>) -> Self {
        self.subtitle_path = Some(subtitle_path.into());
        self
    }

    /// Every file this segment reads, labelled for error messages.
    pub fn inputs(&self) -> Vec<(&'static str, &Path)> {
        let mut inputs = vec![
            ("Image", self.image_path.as_path()),
            ("Audio", self.audio_path.as_path()),
        ];
        if let Some(video) = &self.video_path {
            inputs.push(("Presenter video", video.as_path()));
        }
        if let Some(subtitles) = &self.subtitle_path {
            inputs.push(("Subtitles", subtitles.as_path()));
        }
        inputs
    }

    /// Resolve relative paths against `base`.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        Self {
            image_path: resolve(&self.image_path),
            audio_path: resolve(&self.audio_path),
            video_path: self.video_path.as_deref().map(resolve),
            subtitle_path: self.subtitle_path.as_deref().map(resolve),
        }
    }
}

/// On-disk description of a whole sequence (`sequence.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceManifest {
    /// Segments in output order.
    pub segments: Vec<SegmentSpec>,

    /// Cross-fade length between segments. Accepted but not applied.
    #[serde(default)]
    pub transition_duration: f64,

    /// Overrides for the composition presets.
    #[serde(default)]
    pub composition: CompositionConfig,
}

impl SequenceManifest {
    /// Load a manifest, resolving segment paths relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut manifest: SequenceManifest =
            serde_json::from_str(&content).map_err(|e| ManifestError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.segments = manifest
            .segments
            .iter()
            .map(|segment| segment.resolved_against(base))
            .collect();

        manifest.validate()?;
        Ok(manifest)
    }

    /// Save the manifest as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ManifestError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ManifestError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Structural checks that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.segments.is_empty() {
            return Err(ManifestError::ValidationError {
                message: "sequence contains no segments".to_string(),
            });
        }
        if !self.transition_duration.is_finite() || self.transition_duration < 0.0 {
            return Err(ManifestError::ValidationError {
                message: format!(
                    "transition_duration must be a non-negative number, got {}",
                    self.transition_duration
                ),
            });
        }
        Ok(())
    }

    /// Report every referenced input file that does not exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];
        for (index, segment) in self.segments.iter().enumerate() {
            for (label, path) in segment.inputs() {
                if !path.exists() {
                    errors.push(format!(
                        "Segment {}: {label} source missing: {}",
                        index + 1,
                        path.display()
                    ));
                }
            }
        }
        errors
    }
}

/// Errors that can occur when loading or saving a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid sequence: {message}")]
    ValidationError { message: String },
}
