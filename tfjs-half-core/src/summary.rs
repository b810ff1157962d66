//! Size accounting for a conversion run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `(1 - converted / original) * 100`, or 0 when `original` is 0.
pub fn reduction_percent(original_bytes: u64, converted_bytes: u64) -> f64 {
    if original_bytes == 0 {
        return 0.0;
    }
    (1.0 - converted_bytes as f64 / original_bytes as f64) * 100.0
}

/// Result of narrowing one weight shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightFileReport {
    pub file_name: String,
    pub original_bytes: u64,
    pub converted_bytes: u64,
    pub elements: u64,
    pub overflowed: u64,
    pub underflowed: u64,
}

impl WeightFileReport {
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.original_bytes, self.converted_bytes)
    }
}

/// Aggregate outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub output_dir: PathBuf,
    pub files: Vec<WeightFileReport>,
    pub metadata_copied: bool,
}

impl ConversionSummary {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Default::default()
        }
    }

    pub fn record(&mut self, report: WeightFileReport) {
        self.files.push(report);
    }

    pub fn total_original_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.original_bytes).sum()
    }

    pub fn total_converted_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.converted_bytes).sum()
    }

    pub fn total_elements(&self) -> u64 {
        self.files.iter().map(|f| f.elements).sum()
    }

    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.total_original_bytes(), self.total_converted_bytes())
    }
}
