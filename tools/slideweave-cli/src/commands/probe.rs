//! Show media duration or stream geometry.

use std::path::PathBuf;

use slideweave_common::config::AppConfig;
use slideweave_toolchain::{get_audio_duration, get_video_info};

pub fn run(config: &AppConfig, path: PathBuf, video: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let toolchain = super::toolchain(config);

    println!("Media: {}", path.display());
    if video {
        let info = get_video_info(&toolchain, &path)?;
        println!("  Resolution: {}x{}", info.width, info.height);
        if info.duration > 0.0 {
            println!("  Duration: {:.3}s", info.duration);
        } else {
            println!("  Duration: unknown");
        }
    } else {
        let duration = get_audio_duration(&toolchain, &path)?;
        println!("  Duration: {duration:.3}s");
    }

    Ok(())
}
