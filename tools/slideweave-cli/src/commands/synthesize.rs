//! Render a sequence manifest to a single video.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use slideweave_common::config::AppConfig;
use slideweave_project_model::SequenceManifest;
use slideweave_render_engine::{
    synthesize_async, SequenceSynthesizer, SynthesisOptions, SynthesisProgress, SynthesisStage,
};
use slideweave_subtitles::FontSource;
use slideweave_toolchain::MediaToolchain;

pub struct SynthesizeArgs {
    pub manifest: PathBuf,
    pub output: Option<PathBuf>,
    pub transition: Option<f64>,
    pub temp_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub font: Option<String>,
    pub report: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, args: SynthesizeArgs) -> anyhow::Result<()> {
    println!("Synthesizing sequence: {}", args.manifest.display());

    let manifest = SequenceManifest::load(&args.manifest)
        .map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?;

    let output_path = args
        .output
        .unwrap_or_else(|| default_output(&args.manifest));
    let transition = args.transition.unwrap_or(manifest.transition_duration);

    let mut options = SynthesisOptions::from_config(config);
    options.composition = manifest.composition.clone();
    if let Some(dir) = args.temp_dir {
        options.temp_dir = Some(dir);
    }
    if let Some(jobs) = args.jobs {
        options.parallelism = jobs.max(1);
    }
    options.font = args.font.as_deref().map(font_source);
    tracing::debug!(options = ?options, transition, "Resolved synthesis options");

    let toolchain = super::toolchain(config);
    if !toolchain.is_available() {
        anyhow::bail!(
            "ffmpeg/ffprobe not found (looked for `{}` and `{}`)",
            toolchain.tools().ffmpeg,
            toolchain.tools().ffprobe
        );
    }

    println!("  Segments: {}", manifest.segments.len());
    println!("  Output: {}", output_path.display());
    println!(
        "  Canvas: {}x{} @ {}fps",
        options.composition.width, options.composition.height, options.composition.fps
    );
    if options.parallelism > 1 {
        println!("  Jobs: {}", options.parallelism);
    }

    let progress: Box<dyn Fn(SynthesisProgress) + Send + Sync> = Box::new(|p| {
        let label = match p.stage {
            SynthesisStage::Validating => "validating",
            SynthesisStage::Encoding => "encoding",
            SynthesisStage::Concatenating => "concatenating",
            SynthesisStage::CleaningUp => "cleaning up",
            SynthesisStage::Complete => "complete",
        };
        print!(
            "\r  Progress: {:.0}% ({}/{} segments, {label})          ",
            p.fraction() * 100.0,
            p.completed_segments,
            p.total_segments,
        );
        let _ = std::io::stdout().flush();
    });

    let synthesizer = SequenceSynthesizer::with_options(Arc::new(toolchain), options)
        .with_progress(progress);

    let report = match synthesize_async(
        Arc::new(synthesizer),
        manifest.segments,
        output_path.clone(),
        transition,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            println!("\nSynthesis failed: {e}");
            if let Some(diagnostic) = e.diagnostic() {
                println!("\nffmpeg output:\n{}", diagnostic.trim());
            }
            return Err(e.into());
        }
    };

    println!("\nSynthesis complete: {}", output_path.display());
    println!("  Duration: {:.2}s", report.total_duration_secs());
    for segment in &report.segments {
        println!(
            "  Segment {}: {:.2}s ({})",
            segment.index,
            segment.duration_secs,
            segment.stage.as_str()
        );
    }
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }

    if let Some(report_path) = args.report {
        report.save(&report_path)?;
        println!("\nReport written to {}", report_path.display());
    }

    Ok(())
}

/// `<manifest dir>/output/final.mp4`.
fn default_output(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("output")
        .join("final.mp4")
}

/// An existing path is a font file; anything else is a family name.
fn font_source(font: &str) -> FontSource {
    let path = Path::new(font);
    if path.is_file() {
        FontSource::File(path.to_path_buf())
    } else {
        FontSource::Family(font.to_string())
    }
}
