//! # tfjs-half-core
//!
//! Converts a TensorFlow.js model directory (`model.json` plus flat `.bin`
//! weight shards) from float32 to float16 storage. The descriptor is rewritten
//! as a `graph-model` with every weight spec tagged
//! `quantization: {"dtype": "float16"}`, each shard is narrowed element by
//! element, and `metadata.json` is copied through unchanged.
//!
//! ```no_run
//! use tfjs_half_core::{ConverterConfig, convert_model};
//!
//! let summary = convert_model(&ConverterConfig::new("public/my_model", "out"))?;
//! println!("saved {:.1}%", summary.reduction_percent());
//! # Ok::<(), tfjs_half_core::ConvertError>(())
//! ```

pub mod config;
pub mod converter;
pub mod descriptor;
pub mod error;
pub mod persistence;
pub mod summary;
pub mod weights;

// Re-exports
pub use config::ConverterConfig;
pub use converter::{ModelConverter, convert_model};
pub use descriptor::{ManifestGroup, ModelDescriptor, Quantization, WeightSpec};
pub use error::ConvertError;
pub use summary::{ConversionSummary, WeightFileReport};
pub use weights::{LengthMismatch, narrow_f32_bytes, widen_f16_bytes};
