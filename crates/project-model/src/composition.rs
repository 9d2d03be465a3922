//! Composition presets: canvas, encoder, presenter overlay, and subtitle style.
//!
//! Every segment in a sequence is produced with the same `CompositionConfig`,
//! which is what makes stream-copy concatenation of the segments valid.

use serde::{Deserialize, Serialize};

/// Chroma-key parameters for removing a solid background colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKey {
    /// Key colour as an ffmpeg colour literal.
    pub color: &'static str,
    /// Colour similarity threshold.
    pub similarity: f64,
    /// Edge blend factor.
    pub blend: f64,
}

impl ChromaKey {
    /// Wide tolerance for standalone silhouette extraction.
    pub const SILHOUETTE: ChromaKey = ChromaKey {
        color: "0x00ff00",
        similarity: 0.3,
        blend: 0.2,
    };

    /// Narrow tolerance for the in-pipeline presenter overlay; keeps skin
    /// and hair tones intact.
    pub const PRESENTER_OVERLAY: ChromaKey = ChromaKey {
        color: "0x00ff00",
        similarity: 0.25,
        blend: 0.1,
    };

    /// Render as a `chromakey` filter stage.
    pub fn filter(&self) -> String {
        format!(
            "chromakey={}:{}:{}",
            self.color, self.similarity, self.blend
        )
    }
}

/// Fixed composition pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Output canvas size in pixels.
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video encoder settings.
    pub video: VideoEncoding,

    /// Audio encoder settings.
    pub audio: AudioEncoding,

    /// Presenter overlay placement.
    pub presenter: PresenterOverlay,

    /// Burned-in subtitle appearance.
    pub subtitles: SubtitleStyle,
}

/// libx264 settings shared by the first pass and the subtitle pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoEncoding {
    pub codec: String,
    pub preset: String,
    pub crf: u32,
    pub pix_fmt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEncoding {
    pub codec: String,
    pub bitrate: String,
}

/// Where and how the chroma-keyed presenter clip is composited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterOverlay {
    /// Presenter width as a fraction of canvas width.
    pub width_ratio: f64,
    /// Pixel margin from the bottom-right corner.
    pub margin_px: u32,
    /// Key used on the presenter clip.
    #[serde(skip, default = "presenter_key")]
    pub chroma_key: ChromaKey,
}

fn presenter_key() -> ChromaKey {
    ChromaKey::PRESENTER_OVERLAY
}

/// Appearance of burned-in subtitles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    /// Distance between the text baseline box and the bottom edge.
    pub bottom_margin_px: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 24,
            video: VideoEncoding::default(),
            audio: AudioEncoding::default(),
            presenter: PresenterOverlay::default(),
            subtitles: SubtitleStyle::default(),
        }
    }
}

impl Default for VideoEncoding {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            pix_fmt: "yuv420p".to_string(),
        }
    }
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

impl Default for PresenterOverlay {
    fn default() -> Self {
        Self {
            width_ratio: 0.15,
            margin_px: 20,
            chroma_key: ChromaKey::PRESENTER_OVERLAY,
        }
    }
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size: 48,
            font_color: "white".to_string(),
            border_width: 3,
            border_color: "black".to_string(),
            bottom_margin_px: 50,
        }
    }
}

impl CompositionConfig {
    /// Presenter clip width in pixels for the configured canvas.
    pub fn presenter_width(&self) -> u32 {
        let width = (self.width as f64 * self.presenter.width_ratio).round() as u32;
        // libx264 needs even dimensions downstream.
        (width.max(2) / 2) * 2
    }
}
