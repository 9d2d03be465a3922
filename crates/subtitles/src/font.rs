//! Subtitle font resolution.
//!
//! Burned-in subtitles are mostly Chinese narration, so the renderer needs a
//! font with CJK coverage. Resolution never fails: it walks well-known font
//! files, then asks fontconfig, then settles on a platform default family.

use std::path::{Path, PathBuf};
use std::time::Duration;

use slideweave_toolchain::MediaToolchain;

/// Well-known CJK font files, probed in order.
pub const CJK_FONT_CANDIDATES: &[&str] = &[
    // Windows
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/msyhbd.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    "C:/Windows/Fonts/simsun.ttc",
    "C:/Windows/Fonts/simkai.ttf",
    "C:/Windows/Fonts/STXIHEI.TTF",
    // Linux
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/arphic/uming.ttc",
    "/usr/share/fonts/truetype/arphic/ukai.ttc",
    // macOS
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
];

/// Upper bound on the fontconfig query.
pub const FONT_MATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A resolved font: a concrete file, or a family name left to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    Family(String),
}

impl FontSource {
    /// The `drawtext` option selecting this font.
    pub fn drawtext_option(&self) -> String {
        match self {
            FontSource::File(path) => format!("fontfile='{}'", escape_option_path(path)),
            FontSource::Family(name) => format!("font='{name}'"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FontSource::File(path) => path.display().to_string(),
            FontSource::Family(name) => name.clone(),
        }
    }
}

/// `C:/...` paths need their drive colon escaped inside filter options.
fn escape_option_path(path: &Path) -> String {
    path.display().to_string().replace(':', "\\:")
}

/// Family used when nothing better is found.
pub fn platform_fallback_family() -> &'static str {
    if cfg!(windows) {
        "Microsoft YaHei"
    } else {
        "Arial"
    }
}

/// Resolve a CJK-capable font using the real filesystem.
pub fn resolve_subtitle_font(toolchain: &dyn MediaToolchain) -> FontSource {
    resolve_subtitle_font_with(toolchain, CJK_FONT_CANDIDATES, |p| p.exists())
}

/// Resolution with an injectable candidate list and existence check.
pub fn resolve_subtitle_font_with(
    toolchain: &dyn MediaToolchain,
    candidates: &[&str],
    exists: impl Fn(&Path) -> bool,
) -> FontSource {
    if let Some(found) = candidates.iter().map(Path::new).find(|p| exists(p)) {
        tracing::info!(font = %found.display(), "Found CJK font");
        return FontSource::File(found.to_path_buf());
    }

    tracing::warn!("No CJK font found in standard locations, asking fontconfig");
    let args = vec![
        "-f".to_string(),
        "%{file}".to_string(),
        ":lang=zh".to_string(),
    ];
    match toolchain.match_font(&args, FONT_MATCH_TIMEOUT) {
        Ok(output) if output.success() && !output.stdout.trim().is_empty() => {
            let path = PathBuf::from(output.stdout.trim());
            tracing::info!(font = %path.display(), "Found font via fontconfig");
            FontSource::File(path)
        }
        Ok(output) => {
            tracing::warn!(
                status = %output.status_label(),
                "Fontconfig returned no match, using platform fallback font"
            );
            FontSource::Family(platform_fallback_family().to_string())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Could not query fontconfig, using platform fallback font");
            FontSource::Family(platform_fallback_family().to_string())
        }
    }
}
