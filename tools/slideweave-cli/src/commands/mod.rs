pub mod check;
pub mod chroma_key;
pub mod probe;
pub mod subtitles;
pub mod synthesize;
pub mod validate;

use slideweave_common::config::AppConfig;
use slideweave_toolchain::FfmpegCli;

/// The process-backed toolchain with binaries from the app config.
pub fn toolchain(config: &AppConfig) -> FfmpegCli {
    FfmpegCli::with_tools(config.tools.clone())
}
