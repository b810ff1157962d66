//! Error types for model conversion.
//!
//! Uses `thiserror` for a single public error enum. Every I/O and parse failure
//! carries the path it happened on.

use std::path::{Path, PathBuf};

/// Errors produced while converting a model directory.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("model.json not found: {}", .0.display())]
    DescriptorNotFound(PathBuf),

    #[error("No .bin weight files found in {}", .0.display())]
    NoWeightFiles(PathBuf),

    #[error("Output directory {} is the input directory", .0.display())]
    OutputIsInput(PathBuf),

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize model descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(
        "Weight file {} is {len} bytes, not a multiple of the 4-byte float32 element width",
        path.display()
    )]
    MisalignedWeights { path: PathBuf, len: usize },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Build a closure that wraps an `io::Error` with the given path.
    ///
    /// Meant for `map_err`: `fs::read(&p).map_err(ConvertError::io(&p))?`.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error was raised before any output was written.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::InputDirNotFound(_)
                | Self::DescriptorNotFound(_)
                | Self::NoWeightFiles(_)
                | Self::OutputIsInput(_)
        )
    }
}
