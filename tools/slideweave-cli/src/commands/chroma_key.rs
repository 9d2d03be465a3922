//! Remove the green background from a presenter clip.

use std::path::PathBuf;

use slideweave_common::config::AppConfig;
use slideweave_render_engine::remove_green_background;

pub fn run(config: &AppConfig, input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    println!("Removing green background: {}", input.display());

    let toolchain = super::toolchain(config);
    match remove_green_background(&toolchain, &input, &output) {
        Ok(path) => {
            println!("  Output: {}", path.display());
            Ok(())
        }
        Err(e) => {
            if let Some(diagnostic) = e.diagnostic() {
                println!("\nffmpeg output:\n{}", diagnostic.trim());
            }
            Err(anyhow::anyhow!("Chroma key failed: {e}"))
        }
    }
}
