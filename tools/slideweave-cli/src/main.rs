//! SlideWeave CLI: command-line interface for narrated slideshow synthesis.
//!
//! Usage:
//!   slideweave synthesize <MANIFEST>   Render a sequence manifest to one video
//!   slideweave chroma-key <INPUT>      Remove the green background from a clip
//!   slideweave probe <PATH>            Show media duration or stream geometry
//!   slideweave subtitles <SRT>         Convert SRT to a styled ASS track
//!   slideweave validate <MANIFEST>     Check a manifest and its source files
//!   slideweave check                   Check toolchain capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slideweave_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "slideweave",
    about = "Turn slides, narration, and subtitles into a single video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every segment of a manifest and join them into one video
    Synthesize {
        /// Path to the sequence manifest (JSON)
        manifest: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Transition length in seconds (accepted, not applied)
        #[arg(long)]
        transition: Option<f64>,

        /// Directory for per-segment temp files
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Number of segments to encode at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Subtitle font file or family name
        #[arg(long)]
        font: Option<String>,

        /// Write a JSON synthesis report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Remove the green background from a presenter clip
    ChromaKey {
        /// Green-screen input video
        input: PathBuf,

        /// Output file (WebM with alpha)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show media duration, or video stream geometry with --video
    Probe {
        /// Media file to probe
        path: PathBuf,

        /// Report width, height, and duration of the first video stream
        #[arg(long)]
        video: bool,
    },

    /// Convert an SRT file into a styled ASS subtitle track
    Subtitles {
        /// Input SRT file
        srt: PathBuf,

        /// Output ASS file (defaults to the input with an .ass extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font family written into the track style
        #[arg(long)]
        font: Option<String>,
    },

    /// Validate a sequence manifest
    Validate {
        /// Path to the sequence manifest (JSON)
        manifest: PathBuf,
    },

    /// Check toolchain capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    slideweave_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Synthesize {
            manifest,
            output,
            transition,
            temp_dir,
            jobs,
            font,
            report,
        } => {
            commands::synthesize::run(
                &config,
                commands::synthesize::SynthesizeArgs {
                    manifest,
                    output,
                    transition,
                    temp_dir,
                    jobs,
                    font,
                    report,
                },
            )
            .await
        }
        Commands::ChromaKey { input, output } => commands::chroma_key::run(&config, input, output),
        Commands::Probe { path, video } => commands::probe::run(&config, path, video),
        Commands::Subtitles { srt, output, font } => commands::subtitles::run(srt, output, font),
        Commands::Validate { manifest } => commands::validate::run(manifest),
        Commands::Check => commands::check::run(&config),
    }
}
