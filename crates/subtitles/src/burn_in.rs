//! Burn-in subtitles as a chain of time-gated `drawtext` filters.
//!
//! Each entry becomes one `drawtext` stage enabled only while
//! `start <= t <= end`. Stages are joined with `,` into one linear chain,
//! so overlapping entries simply render at the same time.

use slideweave_project_model::SubtitleStyle;

use crate::font::FontSource;
use crate::SubtitleEntry;

/// Escape text for a single-quoted `drawtext` option value.
pub fn escape_drawtext_text(text: &str) -> String {
    text.replace('\'', "'\\\\\\''").replace(':', "\\:")
}

/// One `drawtext` stage for `entry`.
pub fn drawtext_stage(entry: &SubtitleEntry, font: &FontSource, style: &SubtitleStyle) -> String {
    format!(
        "drawtext={font}:text='{text}':x=(w-text_w)/2:y=h-th-{margin}:fontsize={size}:fontcolor={color}:borderw={border}:bordercolor={border_color}:enable='between(t,{start},{end})'",
        font = font.drawtext_option(),
        text = escape_drawtext_text(&entry.text),
        margin = style.bottom_margin_px,
        size = style.font_size,
        color = style.font_color,
        border = style.border_width,
        border_color = style.border_color,
        start = format_secs(entry.start),
        end = format_secs(entry.end),
    )
}

/// The full filter chain, or `None` when there is nothing to draw.
pub fn build_drawtext_chain(
    entries: &[SubtitleEntry],
    font: &FontSource,
    style: &SubtitleStyle,
) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    Some(
        entries
            .iter()
            .map(|entry| drawtext_stage(entry, font, style))
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn format_secs(secs: f64) -> String {
    let fixed = format!("{secs:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(start: f64, end: f64, text: &str) -> SubtitleEntry {
        SubtitleEntry {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_escape_quotes_and_colons() {
        assert_eq!(escape_drawtext_text("It's 10:30"), "It'\\\\\\''s 10\\:30");
        assert_eq!(escape_drawtext_text("plain"), "plain");
    }

    #[test]
    fn test_stage_layout() {
        let font = FontSource::File(PathBuf::from("/fonts/wqy-microhei.ttc"));
        let stage = drawtext_stage(&entry(1.5, 3.0, "你好"), &font, &SubtitleStyle::default());
        assert_eq!(
            stage,
            "drawtext=fontfile='/fonts/wqy-microhei.ttc':text='你好':x=(w-text_w)/2:y=h-th-50:fontsize=48:fontcolor=white:borderw=3:bordercolor=black:enable='between(t,1.5,3)'"
        );
    }

    #[test]
    fn test_chain_preserves_entry_order() {
        let font = FontSource::Family("Arial".to_string());
        let entries = vec![entry(0.0, 1.0, "first"), entry(0.5, 2.0, "second")];
        let chain = build_drawtext_chain(&entries, &font, &SubtitleStyle::default()).unwrap();

        assert_eq!(chain.matches("drawtext=").count(), 2);
        let first = chain.find("text='first'").unwrap();
        let second = chain.find("text='second'").unwrap();
        assert!(first < second);
        assert!(chain.contains("between(t,0,1)"));
        assert!(chain.contains("between(t,0.5,2)"));
    }

    #[test]
    fn test_empty_entries_produce_no_chain() {
        let font = FontSource::Family("Arial".to_string());
        assert!(build_drawtext_chain(&[], &font, &SubtitleStyle::default()).is_none());
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0.0), "0");
        assert_eq!(format_secs(62.5), "62.5");
        assert_eq!(format_secs(1.001), "1.001");
        assert_eq!(format_secs(10.0), "10");
    }
}
