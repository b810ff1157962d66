//! Human and JSON renderings of a conversion summary.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tfjs_half_core::ConversionSummary;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Text report: one line per shard, then totals.
pub fn render_text(summary: &ConversionSummary, output_dir: &Path) -> String {
    let mut out = String::new();
    for file in &summary.files {
        let _ = writeln!(
            out,
            "    {}: {:.1}KB -> {:.1}KB ({:.1}% reduction)",
            file.file_name,
            file.original_bytes as f64 / KIB,
            file.converted_bytes as f64 / KIB,
            file.reduction_percent(),
        );
    }
    if summary.metadata_copied {
        out.push_str("Copied metadata.json\n");
    }

    out.push_str("\nQUANTIZATION SUMMARY\n");
    let _ = writeln!(
        out,
        "Original total size: {:.2} MB",
        summary.total_original_bytes() as f64 / MIB
    );
    let _ = writeln!(
        out,
        "Quantized total size: {:.2} MB",
        summary.total_converted_bytes() as f64 / MIB
    );
    let _ = writeln!(out, "Overall reduction: {:.1}%", summary.reduction_percent());
    let _ = writeln!(out, "Output directory: {}", output_dir.display());
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    summary: &'a ConversionSummary,
    total_original_bytes: u64,
    total_converted_bytes: u64,
    reduction_percent: f64,
}

/// Pretty JSON report: the summary plus computed totals.
pub fn render_json(summary: &ConversionSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        summary,
        total_original_bytes: summary.total_original_bytes(),
        total_converted_bytes: summary.total_converted_bytes(),
        reduction_percent: summary.reduction_percent(),
    })
}
