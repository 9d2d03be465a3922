//! Error types shared across SlideWeave crates.

use std::path::PathBuf;

/// Top-level error type for SlideWeave operations.
#[derive(Debug, thiserror::Error)]
pub enum SlideweaveError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Encode error: {message}: {diagnostic}")]
    Encode { message: String, diagnostic: String },

    #[error("Subtitle error: {message}")]
    Subtitle { message: String },

    #[error("Manifest error: {message}")]
    Manifest { message: String },

    #[error("Toolchain error: {message}")]
    Toolchain { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SlideweaveError.
pub type SlideweaveResult<T> = Result<T, SlideweaveError>;

impl SlideweaveError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    /// An external encode/concat process failed; `diagnostic` is its stderr.
    pub fn encode(msg: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
            diagnostic: diagnostic.into(),
        }
    }

    pub fn subtitle(msg: impl Into<String>) -> Self {
        Self::Subtitle {
            message: msg.into(),
        }
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest {
            message: msg.into(),
        }
    }

    pub fn toolchain(msg: impl Into<String>) -> Self {
        Self::Toolchain {
            message: msg.into(),
        }
    }

    /// Captured diagnostic output, when the error came from an external process.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Encode { diagnostic, .. } => Some(diagnostic.as_str()),
            _ => None,
        }
    }
}
