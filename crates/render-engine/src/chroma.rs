//! Standalone green-screen removal.
//!
//! Produces a VP9/WebM clip with an alpha channel so the presenter can be
//! composited over arbitrary backgrounds later.

use std::path::{Path, PathBuf};

use slideweave_common::error::{SlideweaveError, SlideweaveResult};
use slideweave_project_model::ChromaKey;
use slideweave_toolchain::{path_arg, MediaToolchain};

/// Arguments for keying out the green background of `input`.
pub fn chroma_key_args(input: &Path, output: &Path, key: &ChromaKey) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(input),
        "-vf".to_string(),
        format!("{},format=yuva420p", key.filter()),
        "-c:v".to_string(),
        "libvpx-vp9".to_string(),
        "-pix_fmt".to_string(),
        "yuva420p".to_string(),
        "-b:v".to_string(),
        "2M".to_string(),
        "-c:a".to_string(),
        "libopus".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        // Alt-ref frames are incompatible with alpha in libvpx.
        "-auto-alt-ref".to_string(),
        "0".to_string(),
        path_arg(output),
    ]
}

/// Remove a solid green background from `input`, writing a transparent clip.
pub fn remove_green_background(
    toolchain: &dyn MediaToolchain,
    input: &Path,
    output: &Path,
) -> SlideweaveResult<PathBuf> {
    if !input.exists() {
        return Err(SlideweaveError::FileNotFound {
            path: input.to_path_buf(),
        });
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let args = chroma_key_args(input, output, &ChromaKey::SILHOUETTE);
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        key = %ChromaKey::SILHOUETTE.filter(),
        "Removing green background"
    );
    tracing::debug!(args = ?args, "Running ffmpeg");

    let result = toolchain.encode(&args)?;
    if !result.success() {
        return Err(SlideweaveError::encode(
            format!("Chroma key failed for {} ({})", input.display(), result.status_label()),
            result.stderr,
        ));
    }

    tracing::info!(output = %output.display(), "Green background removed");
    Ok(output.to_path_buf())
}
