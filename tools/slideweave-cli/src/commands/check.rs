//! Check toolchain capabilities.

use slideweave_common::config::{config_file_path, AppConfig};
use slideweave_subtitles::{resolve_subtitle_font, FontSource};
use slideweave_toolchain::process::binary_runs;
use slideweave_toolchain::{FfmpegCli, MediaToolchain};

struct Capability {
    name: &'static str,
    available: bool,
    required: bool,
    fix: &'static str,
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("SlideWeave System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[--] Config: defaults ({} not found)", config_path.display());
    }

    let toolchain = super::toolchain(config);
    let tools = toolchain.tools();
    let ffmpeg = binary_runs(&tools.ffmpeg);

    let (encoders, filters) = if ffmpeg {
        (listing(&toolchain, "-encoders"), listing(&toolchain, "-filters"))
    } else {
        (String::new(), String::new())
    };

    let capabilities = [
        Capability {
            name: "ffmpeg",
            available: ffmpeg,
            required: true,
            fix: "install ffmpeg or set tools.ffmpeg in the config",
        },
        Capability {
            name: "ffprobe",
            available: binary_runs(&tools.ffprobe),
            required: true,
            fix: "install ffprobe (ships with ffmpeg) or set tools.ffprobe",
        },
        Capability {
            name: "libx264 encoder",
            available: encoders.contains("libx264"),
            required: true,
            fix: "use an ffmpeg build with --enable-libx264",
        },
        Capability {
            name: "chromakey filter",
            available: filters.contains("chromakey"),
            required: false,
            fix: "needed for presenter overlays",
        },
        Capability {
            name: "drawtext filter",
            available: filters.contains("drawtext"),
            required: false,
            fix: "needs libfreetype; subtitles are skipped without it",
        },
        Capability {
            name: "libvpx-vp9 encoder",
            available: encoders.contains("libvpx-vp9"),
            required: false,
            fix: "needed for `slideweave chroma-key`",
        },
    ];

    for capability in &capabilities {
        match (capability.available, capability.required) {
            (true, _) => println!("[OK] {}", capability.name),
            (false, true) => println!("[FAIL] {}: {}", capability.name, capability.fix),
            (false, false) => println!("[WARN] {}: {}", capability.name, capability.fix),
        }
    }

    match resolve_subtitle_font(&toolchain) {
        FontSource::File(path) => println!("[OK] Subtitle font: {}", path.display()),
        FontSource::Family(name) => {
            println!("[WARN] Subtitle font: no CJK font file found, falling back to '{name}'")
        }
    }

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. SlideWeave is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}

/// `ffmpeg -hide_banner <flag>` output, empty on failure.
fn listing(toolchain: &FfmpegCli, flag: &str) -> String {
    let args = vec!["-hide_banner".to_string(), flag.to_string()];
    match toolchain.encode(&args) {
        Ok(output) if output.success() => output.stdout,
        Ok(output) => {
            tracing::warn!(flag, status = %output.status_label(), "ffmpeg listing failed");
            String::new()
        }
        Err(e) => {
            tracing::warn!(flag, error = %e, "ffmpeg listing failed");
            String::new()
        }
    }
}
