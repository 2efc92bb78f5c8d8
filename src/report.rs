//! Benchmark reports
//!
//! [`CaseReport`] is the serializable outcome of one run. Reports can be
//! dumped as JSON or appended to a CSV file with one flat row per run.

use crate::config::Precision;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use spbench_core::{DenseLayout, ThroughputMetrics, TimingSummary};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// Outcome of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub run_id: Uuid,
    pub case: String,
    pub backend: String,
    pub precision: Precision,
    pub layout: DenseLayout,
    pub matrix_path: String,
    pub rows: usize,
    pub cols: usize,
    pub nnz: usize,
    pub warmup: usize,
    pub timing: TimingSummary,
    pub metrics: ThroughputMetrics,
    pub gflops_formula: String,
    pub bandwidth_formula: String,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    run_id: String,
    case: &'a str,
    backend: &'a str,
    precision: Precision,
    layout: DenseLayout,
    matrix: &'a str,
    rows: usize,
    cols: usize,
    nnz: usize,
    warmup: usize,
    samples: usize,
    mean_ns: f64,
    median_ns: f64,
    min_ns: f64,
    max_ns: f64,
    std_dev_ns: f64,
    gflops: f64,
    bandwidth: f64,
    bandwidth_unit: &'a str,
}

impl<'a> From<&'a CaseReport> for CsvRow<'a> {
    fn from(r: &'a CaseReport) -> Self {
        Self {
            run_id: r.run_id.to_string(),
            case: &r.case,
            backend: &r.backend,
            precision: r.precision,
            layout: r.layout,
            matrix: &r.matrix_path,
            rows: r.rows,
            cols: r.cols,
            nnz: r.nnz,
            warmup: r.warmup,
            samples: r.timing.samples,
            mean_ns: r.timing.mean_ns,
            median_ns: r.timing.median_ns,
            min_ns: r.timing.min_ns,
            max_ns: r.timing.max_ns,
            std_dev_ns: r.timing.std_dev_ns,
            gflops: r.metrics.gflops,
            bandwidth: r.metrics.bandwidth,
            bandwidth_unit: &r.bandwidth_formula,
        }
    }
}

impl CaseReport {
    /// One-line human readable summary
    pub fn summary_line(&self) -> String {
        format!(
            "{} <{}> {}x{} nnz={} mean={:.0}ns median={:.0}ns {:.3} {}",
            self.case,
            self.precision,
            self.rows,
            self.cols,
            self.nnz,
            self.timing.mean_ns,
            self.timing.median_ns,
            self.metrics.bandwidth,
            self.bandwidth_formula
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Append reports to a CSV file, writing the header only for a new file
pub fn write_csv(path: impl AsRef<Path>, reports: &[CaseReport]) -> Result<()> {
    let path = path.as_ref();
    let is_new = !path.exists() || std::fs::metadata(path)?.len() == 0;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for report in reports {
        writer.serialize(CsvRow::from(report))?;
    }
    writer.flush()?;
    Ok(())
}
