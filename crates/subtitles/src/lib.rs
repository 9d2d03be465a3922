//! SlideWeave Subtitles
//!
//! - **Parsing:** lenient SRT block parsing into [`SubtitleEntry`] values
//! - **Track output:** styled ASS documents for players that render tracks
//! - **Burn-in:** time-gated `drawtext` chains for rendering into pixels
//! - **Fonts:** CJK font resolution that always yields something usable

use serde::{Deserialize, Serialize};

pub mod ass;
pub mod burn_in;
pub mod font;
pub mod srt;

pub use ass::{parse_ass_dialogues, render_ass, seconds_to_ass_time, srt_to_ass};
pub use burn_in::build_drawtext_chain;
pub use font::{resolve_subtitle_font, FontSource};
pub use srt::{parse_srt, parse_srt_file, srt_time_to_seconds};

/// One timed subtitle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    /// Start time in seconds from the start of the segment.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Text; may contain newlines.
    pub text: String,
}
