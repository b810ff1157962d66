//! End-to-end conversion of model directories on disk.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use tfjs_half_core::descriptor::{CONVERTED_BY, GENERATED_BY};
use tfjs_half_core::{ConvertError, ConverterConfig, convert_model, widen_f16_bytes};

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn bin_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "bin"))
        .collect();
    files.sort();
    files
}

struct Fixture {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("my_model");
        let output = tmp.path().join("temp_quantized");
        std::fs::create_dir(&input).unwrap();
        Self {
            _tmp: tmp,
            input,
            output,
        }
    }

    fn config(&self) -> ConverterConfig {
        ConverterConfig::new(&self.input, &self.output)
    }

    fn write(&self, name: &str, bytes: impl AsRef<[u8]>) {
        std::fs::write(self.input.join(name), bytes).unwrap();
    }

    fn write_json(&self, name: &str, value: &Value) {
        self.write(name, serde_json::to_vec_pretty(value).unwrap());
    }
}

fn single_weight_model() -> Value {
    json!({
        "format": "layers-model",
        "generatedBy": "keras v2.15.0",
        "convertedBy": "TensorFlow.js Converter v4.17.0",
        "modelTopology": { "class_name": "Sequential", "config": { "layers": [] } },
        "weightsManifest": [{
            "paths": ["weights.bin"],
            "weights": [{ "name": "dense/bias", "shape": [2], "dtype": "float32" }]
        }]
    })
}

#[test]
fn converts_single_weight_model() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("weights.bin", f32_bytes(&[1.0, 2.0]));

    let summary = convert_model(&fx.config()).unwrap();

    let weights = std::fs::read(fx.output.join("weights.bin")).unwrap();
    assert_eq!(weights.len(), 4);
    assert_eq!(widen_f16_bytes(&weights).unwrap(), vec![1.0, 2.0]);

    let model = read_json(&fx.output.join("model.json"));
    assert_eq!(
        model,
        json!({
            "format": "graph-model",
            "generatedBy": GENERATED_BY,
            "convertedBy": CONVERTED_BY,
            "modelTopology": { "class_name": "Sequential", "config": { "layers": [] } },
            "weightsManifest": [{
                "paths": ["weights.bin"],
                "weights": [{
                    "name": "dense/bias",
                    "shape": [2],
                    "dtype": "float32",
                    "quantization": { "dtype": "float16" }
                }]
            }]
        })
    );

    assert!(!fx.output.join("metadata.json").exists());
    assert!(!summary.metadata_copied);
    assert_eq!(summary.total_original_bytes(), 8);
    assert_eq!(summary.total_converted_bytes(), 4);
    assert_eq!(summary.reduction_percent(), 50.0);
}

#[test]
fn descriptor_is_written_indented() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("weights.bin", f32_bytes(&[1.0, 2.0]));

    convert_model(&fx.config()).unwrap();

    let text = std::fs::read_to_string(fx.output.join("model.json")).unwrap();
    assert!(text.starts_with("{\n  \"format\": \"graph-model\""));
}

#[test]
fn converts_multiple_groups_and_shards() {
    let fx = Fixture::new();
    let model = json!({
        "format": "layers-model",
        "modelTopology": {},
        "weightsManifest": [
            {
                "paths": ["group1-shard1of2.bin", "group1-shard2of2.bin"],
                "weights": [
                    { "name": "conv/kernel", "shape": [2, 2], "dtype": "float32" },
                    { "name": "conv/bias", "shape": [2], "dtype": "float32" }
                ]
            },
            {
                "paths": ["group2-shard1of1.bin"],
                "weights": [{ "name": "dense/kernel", "shape": [3], "dtype": "float32" }]
            }
        ]
    });
    fx.write_json("model.json", &model);
    fx.write("group1-shard1of2.bin", f32_bytes(&[0.5, -0.5, 0.25, -0.25]));
    fx.write("group1-shard2of2.bin", f32_bytes(&[3.0, 4.0]));
    fx.write("group2-shard1of1.bin", f32_bytes(&[100.0, 0.125, -64.0]));

    let summary = convert_model(&fx.config()).unwrap();

    let names: Vec<_> = summary.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["group1-shard1of2.bin", "group1-shard2of2.bin", "group2-shard1of1.bin"]
    );

    let out = read_json(&fx.output.join("model.json"));
    let in_groups = model["weightsManifest"].as_array().unwrap();
    let out_groups = out["weightsManifest"].as_array().unwrap();
    assert_eq!(in_groups.len(), out_groups.len());
    for (a, b) in in_groups.iter().zip(out_groups) {
        assert_eq!(a["paths"], b["paths"]);
        let a_weights = a["weights"].as_array().unwrap();
        let b_weights = b["weights"].as_array().unwrap();
        assert_eq!(a_weights.len(), b_weights.len());
        for (wa, wb) in a_weights.iter().zip(b_weights) {
            assert_eq!(wa["name"], wb["name"]);
            assert_eq!(wa["shape"], wb["shape"]);
            assert_eq!(wb["quantization"], json!({ "dtype": "float16" }));
        }
    }

    let shard = std::fs::read(fx.output.join("group2-shard1of1.bin")).unwrap();
    assert_eq!(widen_f16_bytes(&shard).unwrap(), vec![100.0, 0.125, -64.0]);
    for file in &summary.files {
        assert_eq!(file.converted_bytes * 2, file.original_bytes);
    }
}

#[test]
fn copies_metadata_byte_for_byte() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("weights.bin", f32_bytes(&[1.0, 2.0]));
    let metadata = b"{\"tfjsVersion\": \"1.3.1\",\n \"labels\": [\"Segar\", \"Busuk\"]}\n";
    fx.write("metadata.json", metadata);

    let summary = convert_model(&fx.config()).unwrap();

    assert!(summary.metadata_copied);
    assert_eq!(
        std::fs::read(fx.output.join("metadata.json")).unwrap(),
        metadata.to_vec()
    );
}

#[test]
fn input_directory_is_left_untouched() {
    let fx = Fixture::new();
    let model = single_weight_model();
    fx.write_json("model.json", &model);
    let original = f32_bytes(&[1.0, 2.0]);
    fx.write("weights.bin", &original);

    convert_model(&fx.config()).unwrap();

    assert_eq!(std::fs::read(fx.input.join("weights.bin")).unwrap(), original);
    assert_eq!(read_json(&fx.input.join("model.json")), model);
}

#[test]
fn missing_input_directory_fails_without_output() {
    let fx = Fixture::new();
    let config = ConverterConfig::new(fx.input.join("nope"), &fx.output);

    let err = convert_model(&config).unwrap_err();

    assert!(matches!(err, ConvertError::InputDirNotFound(_)));
    assert!(!fx.output.exists());
}

#[test]
fn missing_descriptor_fails_without_output() {
    let fx = Fixture::new();
    fx.write("weights.bin", f32_bytes(&[1.0, 2.0]));

    let err = convert_model(&fx.config()).unwrap_err();

    assert!(matches!(err, ConvertError::DescriptorNotFound(_)));
    assert!(!fx.output.join("model.json").exists());
    assert!(bin_files(&fx.output).is_empty());
}

/// Weight shards are enumerated during preflight, so a model with no `.bin`
/// files fails before `model.json` is written and the output directory is
/// never created.
#[test]
fn no_weight_files_fails_before_descriptor_is_written() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("metadata.json", b"{}");

    let err = convert_model(&fx.config()).unwrap_err();

    assert!(matches!(err, ConvertError::NoWeightFiles(_)));
    assert!(err.is_preflight());
    assert!(!fx.output.join("model.json").exists());
    assert!(!fx.output.join("metadata.json").exists());
    assert!(!fx.output.exists());
}

#[test]
fn malformed_descriptor_is_a_parse_error() {
    let fx = Fixture::new();
    fx.write("model.json", b"{ \"weightsManifest\": [ ");
    fx.write("weights.bin", f32_bytes(&[1.0]));

    let err = convert_model(&fx.config()).unwrap_err();

    match err {
        ConvertError::Parse { path, .. } => assert_eq!(path, fx.input.join("model.json")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fx.output.exists());
}

#[test]
fn misaligned_weight_file_fails_fast() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("weights.bin", [0u8; 9]);

    let err = convert_model(&fx.config()).unwrap_err();

    match err {
        ConvertError::MisalignedWeights { path, len } => {
            assert_eq!(path, fx.input.join("weights.bin"));
            assert_eq!(len, 9);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The descriptor is written before shards are narrowed; the broken shard is not.
    assert!(fx.output.join("model.json").exists());
    assert!(!fx.output.join("weights.bin").exists());
}

#[test]
fn empty_weight_file_reports_zero_reduction() {
    let fx = Fixture::new();
    fx.write_json(
        "model.json",
        &json!({ "weightsManifest": [{ "paths": ["empty.bin"], "weights": [] }] }),
    );
    fx.write("empty.bin", b"");

    let summary = convert_model(&fx.config()).unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].reduction_percent(), 0.0);
    assert_eq!(summary.reduction_percent(), 0.0);
    assert_eq!(std::fs::read(fx.output.join("empty.bin")).unwrap().len(), 0);
}

#[test]
fn descriptor_without_manifest_gets_empty_manifest() {
    let fx = Fixture::new();
    fx.write_json("model.json", &json!({ "format": "layers-model" }));
    fx.write("weights.bin", f32_bytes(&[1.0]));

    convert_model(&fx.config()).unwrap();

    let out = read_json(&fx.output.join("model.json"));
    assert_eq!(out["weightsManifest"], json!([]));
    assert_eq!(out["modelTopology"], json!({}));
    assert_eq!(out["format"], json!("graph-model"));
}

#[test]
fn rerun_overwrites_previous_output() {
    let fx = Fixture::new();
    fx.write_json("model.json", &single_weight_model());
    fx.write("weights.bin", f32_bytes(&[1.0, 2.0]));
    convert_model(&fx.config()).unwrap();

    fx.write("weights.bin", f32_bytes(&[4.0, 8.0]));
    convert_model(&fx.config()).unwrap();

    let weights = std::fs::read(fx.output.join("weights.bin")).unwrap();
    assert_eq!(widen_f16_bytes(&weights).unwrap(), vec![4.0, 8.0]);
    assert!(!fx.output.join("weights.bin.tmp").exists());
}
