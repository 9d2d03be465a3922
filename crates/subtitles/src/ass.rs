//! Styled subtitle track (ASS) output.

use std::path::Path;

use slideweave_common::error::{SlideweaveError, SlideweaveResult};

use crate::srt::parse_srt_file;
use crate::SubtitleEntry;

/// Font used for track files when the caller does not pick one.
pub const DEFAULT_TRACK_FONT: &str = "STHeiti Medium";

const EVENT_PREFIX: &str = "Dialogue: ";

/// Format seconds as an ASS timestamp: `H:MM:SS.CC` (hours unpadded).
pub fn seconds_to_ass_time(seconds: f64) -> String {
    // Go through whole milliseconds first so 1.23 does not become 1.22.
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let centis = (total_ms % 1000) / 10;
    format!("{hours}:{minutes:02}:{secs:02}.{centis:02}")
}

/// Parse an ASS timestamp back into seconds.
pub fn ass_time_to_seconds(timestamp: &str) -> SlideweaveResult<f64> {
    let invalid = || SlideweaveError::subtitle(format!("Invalid ASS timestamp {timestamp:?}"));

    let (clock, centis) = timestamp.trim().split_once('.').ok_or_else(invalid)?;
    let mut fields = clock.split(':');
    let (Some(h), Some(m), Some(s), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };
    let parse = |field: &str| field.parse::<u64>().map_err(|_| invalid());
    let (h, m, s, cs) = (parse(h)?, parse(m)?, parse(s)?, parse(centis)?);

    let whole = h
        .checked_mul(3600)
        .and_then(|v| v.checked_add(m.checked_mul(60)?))
        .and_then(|v| v.checked_add(s))
        .ok_or_else(invalid)?;
    Ok(whole as f64 + cs as f64 / 100.0)
}

/// Render entries as a complete ASS document on a 1920x1080 canvas.
pub fn render_ass(entries: &[SubtitleEntry], font_name: &str) -> String {
    let mut output = format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: 1920\n\
         PlayResY: 1080\n\
         WrapStyle: 0\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{font_name},48,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,3,0,2,10,10,50,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    );

    for entry in entries {
        output.push_str(&format!(
            "{EVENT_PREFIX}0,{},{},Default,,0,0,0,,{}\n",
            seconds_to_ass_time(entry.start),
            seconds_to_ass_time(entry.end),
            entry.text.replace('\n', "\\N"),
        ));
    }

    output
}

/// Read back the `Dialogue:` events of an ASS document.
///
/// Only the fields this crate writes are interpreted; `\N` becomes a newline.
pub fn parse_ass_dialogues(content: &str) -> SlideweaveResult<Vec<SubtitleEntry>> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix(EVENT_PREFIX))
        .map(|fields| {
            // Text is the tenth field and may itself contain commas.
            let parts: Vec<&str> = fields.splitn(10, ',').collect();
            if parts.len() < 10 {
                return Err(SlideweaveError::subtitle(format!(
                    "Dialogue line has {} fields, expected 10",
                    parts.len()
                )));
            }
            Ok(SubtitleEntry {
                start: ass_time_to_seconds(parts[1])?,
                end: ass_time_to_seconds(parts[2])?,
                text: parts[9].replace("\\N", "\n"),
            })
        })
        .collect()
}

/// Convert an SRT file into an ASS track file.
pub fn srt_to_ass(srt_path: &Path, ass_path: &Path, font_name: &str) -> SlideweaveResult<usize> {
    let entries = parse_srt_file(srt_path)?;
    std::fs::write(ass_path, render_ass(&entries, font_name))?;
    tracing::info!(
        srt = %srt_path.display(),
        ass = %ass_path.display(),
        entries = entries.len(),
        font = font_name,
        "Converted SRT to ASS"
    );
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srt::parse_srt;
    use proptest::prelude::*;

    #[test]
    fn test_seconds_to_ass_time() {
        assert_eq!(seconds_to_ass_time(62.5), "0:01:02.50");
        assert_eq!(seconds_to_ass_time(0.0), "0:00:00.00");
        assert_eq!(seconds_to_ass_time(3723.456), "1:02:03.45");
        assert_eq!(seconds_to_ass_time(1.23), "0:00:01.23");
        assert_eq!(seconds_to_ass_time(36000.0), "10:00:00.00");
    }

    #[test]
    fn test_ass_time_round_trip() {
        assert_eq!(ass_time_to_seconds("0:01:02.50").unwrap(), 62.5);
        assert!(ass_time_to_seconds("0:01:02").is_err());
    }

    #[test]
    fn test_overflowing_ass_timestamp_is_error() {
        assert!(ass_time_to_seconds("99999999999999999:00:00.00").is_err());
    }

    #[test]
    fn test_render_ass_header_and_events() {
        let entries = vec![SubtitleEntry {
            start: 1.0,
            end: 2.5,
            text: "第一行\nsecond".to_string(),
        }];
        let ass = render_ass(&entries, "Noto Sans CJK SC");
        assert!(ass.starts_with("[Script Info]\nScriptType: v4.00+\nPlayResX: 1920\nPlayResY: 1080\n"));
        assert!(ass.contains("Style: Default,Noto Sans CJK SC,48,"));
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,第一行\\Nsecond\n"));
    }

    #[test]
    fn test_dialogue_text_with_commas_survives() {
        let entries = vec![SubtitleEntry {
            start: 0.0,
            end: 1.0,
            text: "one, two, three".to_string(),
        }];
        let parsed = parse_ass_dialogues(&render_ass(&entries, DEFAULT_TRACK_FONT)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_srt_to_ass_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let srt = dir.path().join("in.srt");
        let ass = dir.path().join("out.ass");
        std::fs::write(&srt, "1\n00:00:00,000 --> 00:00:01,000\nHi\n").unwrap();

        let count = srt_to_ass(&srt, &ass, DEFAULT_TRACK_FONT).unwrap();
        assert_eq!(count, 1);
        let content = std::fs::read_to_string(&ass).unwrap();
        assert!(content.contains("Style: Default,STHeiti Medium,"));
        assert!(content.contains(",Hi\n"));
    }

    fn srt_timecode(ms: u64) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            ms / 3_600_000,
            (ms % 3_600_000) / 60_000,
            (ms % 60_000) / 1000,
            ms % 1000
        )
    }

    proptest! {
        #[test]
        fn prop_srt_to_ass_round_trip(
            blocks in proptest::collection::vec(
                (0u64..36_000_000, 1u64..600_000, proptest::collection::vec("[A-Za-z0-9 ,.!?]{1,24}", 1..3)),
                1..12,
            )
        ) {
            let srt: String = blocks
                .iter()
                .enumerate()
                .map(|(i, (start, len, lines))| {
                    format!(
                        "{}\n{} --> {}\n{}\n\n",
                        i + 1,
                        srt_timecode(*start),
                        srt_timecode(start + len),
                        lines.iter().map(|l| l.trim()).map(|l| if l.is_empty() { "x" } else { l }).collect::<Vec<_>>().join("\n"),
                    )
                })
                .collect();

            let parsed = parse_srt(&srt).unwrap();
            let reparsed = parse_ass_dialogues(&render_ass(&parsed, DEFAULT_TRACK_FONT)).unwrap();

            prop_assert_eq!(parsed.len(), blocks.len());
            prop_assert_eq!(reparsed.len(), parsed.len());
            for (original, round_tripped) in parsed.iter().zip(&reparsed) {
                prop_assert!((original.start - round_tripped.start).abs() < 0.01 + 1e-9);
                prop_assert!((original.end - round_tripped.end).abs() < 0.01 + 1e-9);
                prop_assert_eq!(&original.text, &round_tripped.text);
            }
        }
    }
}
