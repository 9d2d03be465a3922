//! Validate a sequence manifest.

use std::path::PathBuf;

use slideweave_project_model::SequenceManifest;
use slideweave_subtitles::parse_srt_file;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating manifest at: {}", path.display());

    let manifest = SequenceManifest::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?;

    println!("  Segments: {}", manifest.segments.len());
    println!(
        "  Canvas: {}x{} @ {}fps",
        manifest.composition.width, manifest.composition.height, manifest.composition.fps
    );
    let presenters = manifest
        .segments
        .iter()
        .filter(|s| s.video_path.is_some())
        .count();
    println!("  Presenter clips: {presenters}");

    // Check source files
    let mut errors = manifest.validate_sources();
    for (index, segment) in manifest.segments.iter().enumerate() {
        if let Some(srt) = segment.subtitle_path.as_deref().filter(|p| p.exists()) {
            if let Err(e) = parse_srt_file(srt) {
                errors.push(format!("Segment {}: {e}", index + 1));
            }
        }
    }

    if errors.is_empty() {
        println!("  Sources: All present");
        println!("\nManifest is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!("\n{} issue(s) found. Synthesis will fail.", errors.len());
    }

    Ok(())
}
