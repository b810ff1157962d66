//! The conversion pipeline.
//!
//! Stages run strictly in order and the first failure ends the run:
//!
//! 1. preflight: input dir, `model.json`, at least one `.bin` shard
//! 2. parse `model.json`
//! 3. create the output dir and write the float16 graph-model descriptor
//! 4. narrow each shard in file-name order
//! 5. copy `metadata.json` if present
//!
//! Nothing is written before preflight and parsing succeed. A failure after
//! that may leave a partially populated output directory behind.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::ConverterConfig;
use crate::descriptor::{self, ModelDescriptor};
use crate::error::ConvertError;
use crate::persistence;
use crate::summary::ConversionSummary;
use crate::weights;

/// Check that the input directory and its `model.json` exist, and that the
/// output directory would not overwrite the input. Returns the descriptor path.
pub fn locate_inputs(config: &ConverterConfig) -> Result<PathBuf, ConvertError> {
    if !config.input_dir.is_dir() {
        return Err(ConvertError::InputDirNotFound(config.input_dir.clone()));
    }

    let descriptor_path = config.input_descriptor();
    if !descriptor_path.is_file() {
        return Err(ConvertError::DescriptorNotFound(descriptor_path));
    }

    if same_dir(&config.input_dir, &config.output_dir) {
        return Err(ConvertError::OutputIsInput(config.output_dir.clone()));
    }

    Ok(descriptor_path)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy `metadata.json` verbatim. Returns `false` when the input has none.
pub fn copy_metadata(config: &ConverterConfig) -> Result<bool, ConvertError> {
    let source = config.input_metadata();
    if !source.is_file() {
        tracing::debug!(path = %source.display(), "No metadata.json to copy");
        return Ok(false);
    }
    let bytes = persistence::copy_verbatim(&source, &config.output_metadata())?;
    tracing::info!(bytes, "Copied metadata.json");
    Ok(true)
}

/// Warn about manifest paths with no shard on disk and shards no manifest
/// group references. Neither stops the run.
fn check_manifest_paths(descriptor: &ModelDescriptor, weight_files: &[PathBuf]) {
    let on_disk: BTreeSet<String> = weight_files
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let referenced: BTreeSet<&str> = descriptor.weight_paths().collect();

    for path in &referenced {
        if !on_disk.contains(*path) {
            tracing::warn!(
                path = *path,
                "Manifest references a weight file that is not in the input directory"
            );
        }
    }
    for name in &on_disk {
        if !referenced.contains(name.as_str()) {
            tracing::warn!(file = %name, "Weight file is not referenced by the manifest");
        }
    }
}

/// Converts a float32 TensorFlow.js model directory to float16.
pub struct ModelConverter {
    config: ConverterConfig,
}

impl ModelConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Run the whole pipeline.
    pub fn run(&self) -> Result<ConversionSummary, ConvertError> {
        let config = &self.config;
        tracing::info!(
            input = %config.input_dir.display(),
            output = %config.output_dir.display(),
            "Starting float16 conversion"
        );

        let descriptor_path = locate_inputs(config)?;
        let weight_files = weights::enumerate_weight_files(&config.input_dir)?;
        tracing::debug!(count = weight_files.len(), "Found weight files");

        let model = descriptor::load_descriptor(&descriptor_path)?;
        check_manifest_paths(&model, &weight_files);

        std::fs::create_dir_all(&config.output_dir).map_err(ConvertError::io(&config.output_dir))?;
        tracing::info!(path = %config.output_dir.display(), "Output directory ready");

        let adapted = model.to_float16_graph_model();
        descriptor::write_descriptor(&config.output_descriptor(), &adapted)?;
        tracing::info!(
            groups = adapted.groups().len(),
            weights = adapted.weight_count(),
            "Wrote graph-model descriptor"
        );

        let mut summary = ConversionSummary::new(config.output_dir.clone());
        for input in &weight_files {
            let Some(file_name) = input.file_name() else {
                continue;
            };
            let report = weights::convert_weight_file(input, &config.output_path_for(file_name))?;
            tracing::debug!(
                file = %report.file_name,
                original_bytes = report.original_bytes,
                converted_bytes = report.converted_bytes,
                "Narrowed weight file"
            );
            summary.record(report);
        }

        summary.metadata_copied = copy_metadata(config)?;

        tracing::info!(
            files = summary.files.len(),
            original_bytes = summary.total_original_bytes(),
            converted_bytes = summary.total_converted_bytes(),
            "Conversion complete"
        );
        Ok(summary)
    }
}

/// Convenience wrapper: `ModelConverter::new(config.clone()).run()`.
pub fn convert_model(config: &ConverterConfig) -> Result<ConversionSummary, ConvertError> {
    ModelConverter::new(config.clone()).run()
}
