//! Lenient SRT parsing.
//!
//! Blocks are separated by blank lines and look like:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,500
//! First line
//! optional second line
//! ```
//!
//! Blocks with fewer than three lines are skipped without error. Only an
//! unreadable file or a malformed timecode line fails the parse.

use std::path::Path;

use slideweave_common::error::{SlideweaveError, SlideweaveResult};

use crate::SubtitleEntry;

const ARROW: &str = " --> ";

/// Parse SRT content into entries in appearance order.
pub fn parse_srt(content: &str) -> SlideweaveResult<Vec<SubtitleEntry>> {
    let normalized = content.replace("\r\n", "\n");
    let mut entries = Vec::new();

    for (block_index, block) in normalized.trim().split("\n\n").enumerate() {
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.len() < 3 {
            tracing::debug!(
                block = block_index + 1,
                lines = lines.len(),
                "Skipping incomplete subtitle block"
            );
            continue;
        }

        let (start, end) = lines[1].split_once(ARROW).ok_or_else(|| {
            SlideweaveError::subtitle(format!(
                "Block {}: expected `start --> end`, got {:?}",
                block_index + 1,
                lines[1]
            ))
        })?;

        entries.push(SubtitleEntry {
            start: srt_time_to_seconds(start)?,
            end: srt_time_to_seconds(end)?,
            text: lines[2..].join("\n"),
        });
    }

    Ok(entries)
}

/// Read and parse an SRT file.
pub fn parse_srt_file(path: &Path) -> SlideweaveResult<Vec<SubtitleEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SlideweaveError::subtitle(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_srt(&content).map_err(|e| match e {
        SlideweaveError::Subtitle { message } => {
            SlideweaveError::subtitle(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Convert an `HH:MM:SS,mmm` timecode to seconds.
pub fn srt_time_to_seconds(timecode: &str) -> SlideweaveResult<f64> {
    let invalid = || SlideweaveError::subtitle(format!("Invalid SRT timecode {timecode:?}"));

    let (clock, millis) = timecode.trim().split_once(',').ok_or_else(invalid)?;
    let mut fields = clock.split(':');
    let (Some(h), Some(m), Some(s), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let parse = |field: &str| field.trim().parse::<u64>().map_err(|_| invalid());
    let (h, m, s, ms) = (parse(h)?, parse(m)?, parse(s)?, parse(millis)?);

    let whole = h
        .checked_mul(3600)
        .and_then(|v| v.checked_add(m.checked_mul(60)?))
        .and_then(|v| v.checked_add(s))
        .ok_or_else(invalid)?;
    Ok(whole as f64 + ms as f64 / 1000.0)
}
