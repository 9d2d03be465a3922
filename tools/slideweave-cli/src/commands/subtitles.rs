//! Convert SRT subtitles into a styled ASS track.

use std::path::PathBuf;

use slideweave_subtitles::ass::DEFAULT_TRACK_FONT;
use slideweave_subtitles::{parse_ass_dialogues, seconds_to_ass_time, srt_to_ass};

pub fn run(srt: PathBuf, output: Option<PathBuf>, font: Option<String>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| srt.with_extension("ass"));
    let font = font.unwrap_or_else(|| DEFAULT_TRACK_FONT.to_string());

    println!("Converting subtitles: {}", srt.display());
    let count = srt_to_ass(&srt, &output, &font)?;

    let written = std::fs::read_to_string(&output)?;
    let entries = parse_ass_dialogues(&written)?;

    println!("  Output: {}", output.display());
    println!("  Font: {font}");
    println!("  Entries: {count}");
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        println!(
            "  Span: {} -> {}",
            seconds_to_ass_time(first.start),
            seconds_to_ass_time(last.end)
        );
    }

    Ok(())
}
