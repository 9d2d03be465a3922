//! SlideWeave Render Engine
//!
//! Turns an ordered list of slides with narration into one video file by
//! driving the external media toolchain.
//!
//! # Pipeline Architecture
//!
//! ```text
//! slide.png ─────┐
//!                ├── Loop + Scale (1920x1080 @ 24fps)
//! narration.mp3 ─┤         │
//!                │         ├── Presenter Overlay (chroma key, bottom-right)
//! presenter.mp4 ─┘         │
//!                          ▼
//!                   Encode (H.264/AAC) ──► segment_N.mp4.presub.mp4
//!                          │
//! slide.srt ───────────────┴── Subtitle Burn-in (drawtext) ──► segment_N.mp4
//!                                                                  │
//!                              segment_1 … segment_K ──────────────┘
//!                                        │
//!                                        ▼
//!                             Concat (stream copy) ──► output.mp4
//! ```

pub mod chroma;
pub mod cleanup;
pub mod segment;
pub mod sequence;

pub use chroma::remove_green_background;
pub use cleanup::SynthesisWarning;
pub use segment::{SegmentArtifact, SegmentCompositor, SegmentStage};
pub use sequence::{
    synthesize_async, ProgressCallback, SegmentSummary, SequenceSynthesizer, SynthesisOptions,
    SynthesisProgress, SynthesisReport, SynthesisStage,
};
