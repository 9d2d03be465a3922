//! SlideWeave Project Model
//!
//! Defines the core data contracts for narrated slideshow sequences:
//! - **Segments:** one image + narration clip, optional presenter clip and subtitles
//! - **Manifest:** the ordered segment list as stored on disk
//! - **Composition:** the fixed canvas, encoder, overlay, and subtitle presets
//!
//! Segment order in a manifest is the order segments appear in the final video.

pub mod composition;
pub mod sequence;

pub use composition::*;
pub use sequence::*;
