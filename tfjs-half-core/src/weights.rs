//! Weight shard discovery and float32 -> float16 narrowing.
//!
//! A shard is a flat little-endian array with no header. Narrowing uses
//! `half::f16::from_f32`: round-to-nearest-even, overflow to infinity,
//! subnormals per the binary16 format, NaN stays NaN.

use half::f16;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::WEIGHTS_EXTENSION;
use crate::error::ConvertError;
use crate::persistence;
use crate::summary::WeightFileReport;

/// Width of one source element in bytes.
pub const F32_WIDTH: usize = std::mem::size_of::<f32>();

/// Width of one narrowed element in bytes.
pub const F16_WIDTH: usize = std::mem::size_of::<f16>();

/// A buffer whose length is not a whole number of elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{len} bytes is not a multiple of the {width}-byte element width")]
pub struct LengthMismatch {
    pub len: usize,
    pub width: usize,
}

/// Values that lost more than rounding precision while narrowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NarrowingStats {
    pub elements: usize,
    /// Finite inputs beyond the float16 range, now infinite.
    pub overflowed: usize,
    /// Non-zero inputs below the smallest float16 subnormal, now zero.
    pub underflowed: usize,
}

/// Output of [`narrow_f32_bytes`].
#[derive(Debug, Clone, PartialEq)]
pub struct Narrowed {
    pub bytes: Vec<u8>,
    pub stats: NarrowingStats,
}

fn check_len(bytes: &[u8], width: usize) -> Result<usize, LengthMismatch> {
    if bytes.len() % width != 0 {
        return Err(LengthMismatch {
            len: bytes.len(),
            width,
        });
    }
    Ok(bytes.len() / width)
}

/// Reinterpret `bytes` as little-endian f32 values and re-encode each as
/// little-endian f16. The result is exactly half as long as the input.
pub fn narrow_f32_bytes(bytes: &[u8]) -> Result<Narrowed, LengthMismatch> {
    let elements = check_len(bytes, F32_WIDTH)?;
    let mut out = Vec::with_capacity(elements * F16_WIDTH);
    let mut stats = NarrowingStats {
        elements,
        ..Default::default()
    };

    for chunk in bytes.chunks_exact(F32_WIDTH) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let narrowed = f16::from_f32(value);
        if value.is_finite() && narrowed.is_infinite() {
            stats.overflowed += 1;
        } else if value != 0.0 && narrowed.to_f32() == 0.0 {
            stats.underflowed += 1;
        }
        out.extend_from_slice(&narrowed.to_le_bytes());
    }

    Ok(Narrowed { bytes: out, stats })
}

/// Decode a little-endian f16 buffer back to f32 values.
pub fn widen_f16_bytes(bytes: &[u8]) -> Result<Vec<f32>, LengthMismatch> {
    check_len(bytes, F16_WIDTH)?;
    Ok(bytes
        .chunks_exact(F16_WIDTH)
        .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
        .collect())
}

/// List the `.bin` shards directly inside `dir`, sorted by file name.
///
/// An empty listing is an error: a model without weights cannot be converted.
pub fn enumerate_weight_files(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ConvertError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() == Some(OsStr::new(WEIGHTS_EXTENSION)) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ConvertError::NoWeightFiles(dir.to_path_buf()));
    }
    Ok(files)
}

/// Narrow one shard from `input` into `output`.
pub fn convert_weight_file(input: &Path, output: &Path) -> Result<WeightFileReport, ConvertError> {
    let original = persistence::read_bytes(input)?;
    let narrowed = narrow_f32_bytes(&original).map_err(|e| ConvertError::MisalignedWeights {
        path: input.to_path_buf(),
        len: e.len,
    })?;
    persistence::atomic_write(output, &narrowed.bytes)?;

    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stats = narrowed.stats;
    if stats.overflowed > 0 || stats.underflowed > 0 {
        tracing::warn!(
            file = %file_name,
            overflowed = stats.overflowed,
            underflowed = stats.underflowed,
            "Some values fell outside the float16 range"
        );
    }

    Ok(WeightFileReport {
        file_name,
        original_bytes: original.len() as u64,
        converted_bytes: narrowed.bytes.len() as u64,
        elements: stats.elements as u64,
        overflowed: stats.overflowed as u64,
        underflowed: stats.underflowed as u64,
    })
}
