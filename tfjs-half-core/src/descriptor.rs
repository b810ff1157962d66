//! The `model.json` descriptor: parsing, float16 adaptation, and writing.
//!
//! Only the fields this tool rewrites are typed. `modelTopology` and any
//! weight-spec attribute the tool does not know about stay as raw
//! `serde_json::Value`s and are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::ConvertError;
use crate::persistence;

/// `format` tag written to every converted descriptor.
pub const GRAPH_MODEL_FORMAT: &str = "graph-model";

/// Provenance written to `generatedBy`.
pub const GENERATED_BY: &str = concat!("tfjs-half ", env!("CARGO_PKG_VERSION"));

/// Provenance written to `convertedBy`.
pub const CONVERTED_BY: &str = concat!(
    "tfjs-half ",
    env!("CARGO_PKG_VERSION"),
    " (float32 to float16 weight narrowing)"
);

/// Storage dtype recorded in each weight spec's quantization tag.
pub const FLOAT16_DTYPE: &str = "float16";

/// A TensorFlow.js model descriptor (`model.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_by: Option<String>,
    /// Opaque layer graph. Never inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_topology: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_manifest: Option<Vec<ManifestGroup>>,
    /// Top-level keys not listed above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A set of weight shards and the tensors stored across them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestGroup {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub weights: Vec<WeightSpec>,
}

/// One named tensor inside a manifest group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<Quantization>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Storage precision marker attached to a weight spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantization {
    pub dtype: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Quantization {
    pub fn float16() -> Self {
        Self {
            dtype: FLOAT16_DTYPE.to_string(),
            extra: Map::new(),
        }
    }

    pub fn is_float16(&self) -> bool {
        self.dtype == FLOAT16_DTYPE && self.extra.is_empty()
    }
}

impl WeightSpec {
    /// Number of scalar elements implied by `shape` (1 for a scalar).
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Tag this spec as stored in float16, replacing any previous tag.
    pub fn mark_float16(&mut self) {
        if let Some(previous) = &self.quantization
            && !previous.is_float16()
        {
            tracing::warn!(
                weight = %self.name,
                previous = %previous.dtype,
                "Replacing existing quantization tag with float16"
            );
        }
        self.quantization = Some(Quantization::float16());
    }
}

impl ManifestGroup {
    /// Same paths, same weights, every weight tagged float16.
    pub fn to_float16(&self) -> Self {
        let mut weights = self.weights.clone();
        for spec in &mut weights {
            spec.mark_float16();
        }
        Self {
            paths: self.paths.clone(),
            weights,
        }
    }
}

impl ModelDescriptor {
    /// Build the graph-model descriptor written next to the narrowed weights.
    ///
    /// `modelTopology` defaults to `{}` and `weightsManifest` to `[]` when the
    /// input lacks them. Unknown top-level keys of `self` are not carried over.
    pub fn to_float16_graph_model(&self) -> Self {
        let weights_manifest = self
            .weights_manifest
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ManifestGroup::to_float16)
            .collect();

        Self {
            format: Some(GRAPH_MODEL_FORMAT.to_string()),
            generated_by: Some(GENERATED_BY.to_string()),
            converted_by: Some(CONVERTED_BY.to_string()),
            model_topology: Some(
                self.model_topology
                    .clone()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            ),
            weights_manifest: Some(weights_manifest),
            extra: Map::new(),
        }
    }

    pub fn groups(&self) -> &[ManifestGroup] {
        self.weights_manifest.as_deref().unwrap_or_default()
    }

    /// Every shard path referenced by the manifest, in manifest order.
    pub fn weight_paths(&self) -> impl Iterator<Item = &str> {
        self.groups()
            .iter()
            .flat_map(|g| g.paths.iter().map(String::as_str))
    }

    pub fn weight_count(&self) -> usize {
        self.groups().iter().map(|g| g.weights.len()).sum()
    }
}

/// Read and parse a descriptor file.
pub fn load_descriptor(path: &Path) -> Result<ModelDescriptor, ConvertError> {
    let bytes = persistence::read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a descriptor as indented JSON.
pub fn write_descriptor(path: &Path, descriptor: &ModelDescriptor) -> Result<(), ConvertError> {
    persistence::atomic_write_json(path, descriptor)
}
