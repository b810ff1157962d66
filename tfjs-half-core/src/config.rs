//! Conversion parameters.
//!
//! The core pipeline takes explicit directories only. Default locations belong
//! to the entry point that builds this config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the model descriptor inside a model directory.
pub const DESCRIPTOR_FILE: &str = "model.json";

/// File name of the optional auxiliary metadata copied verbatim.
pub const METADATA_FILE: &str = "metadata.json";

/// Extension of binary weight shards.
pub const WEIGHTS_EXTENSION: &str = "bin";

/// Source and destination of a single conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding `model.json`, the `.bin` shards and optional `metadata.json`.
    pub input_dir: PathBuf,
    /// Directory the converted model is written to. Created if absent.
    pub output_dir: PathBuf,
}

impl ConverterConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input_descriptor(&self) -> PathBuf {
        self.input_dir.join(DESCRIPTOR_FILE)
    }

    pub fn output_descriptor(&self) -> PathBuf {
        self.output_dir.join(DESCRIPTOR_FILE)
    }

    pub fn input_metadata(&self) -> PathBuf {
        self.input_dir.join(METADATA_FILE)
    }

    pub fn output_metadata(&self) -> PathBuf {
        self.output_dir.join(METADATA_FILE)
    }

    /// Path a weight shard named `file_name` is written to.
    pub fn output_path_for(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
