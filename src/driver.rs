//! Benchmark driver
//!
//! Runs a case through its phases in the fixed order, discards warm-up
//! samples and collects the timing summary and derived metrics.

use crate::config::{Precision, RunConfig};
use crate::error::Result;
use crate::report::{write_csv, CaseReport};
use spbench_cases::{Csr2Dense, DenseConversion, HostDenseConversion};
use spbench_core::{BenchmarkCase, Element, HostDevice, StatisticalTimer, ThroughputMetrics, TimingSummary};
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument};
use uuid::Uuid;

/// Timing and metrics gathered by [`run_case`]
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub case: String,
    pub timing: TimingSummary,
    pub metrics: ThroughputMetrics,
    pub gflops_formula: &'static str,
    pub bandwidth_formula: &'static str,
}

/// Drive `case` through every phase and measure it
///
/// The first failing phase aborts the run. Buffers of a failed run are freed
/// when the case is dropped.
#[instrument(skip_all, fields(case = case.name(), iterations = config.iterations))]
pub fn run_case<C: BenchmarkCase + ?Sized>(case: &mut C, config: &RunConfig) -> Result<Measurement> {
    config.validate()?;

    case.setup(config.alpha, config.beta, &config.matrix_path)?;
    case.initialize_cpu()?;
    case.stage()?;

    {
        let _span = info_span!("warmup", count = config.warmup).entered();
        for _ in 0..config.warmup {
            case.reset()?;
            case.run()?;
        }
    }
    case.timer().reset(case.timer_id());

    {
        let _span = info_span!("measure", count = config.iterations).entered();
        for i in 0..config.iterations {
            case.reset()?;
            case.run()?;
            debug!(iteration = i, "iteration complete");
        }
    }
    case.read_back()?;

    let timing = case.timer().summary(case.timer_id()).ok_or_else(|| {
        spbench_core::Error::InvalidInput(format!("timer series for {} is not registered", case.name()))
    })?;
    let metrics = case.throughput_metrics();
    let measurement = Measurement {
        case: case.name().to_string(),
        timing,
        metrics,
        gflops_formula: case.gflops_formula(),
        bandwidth_formula: case.bandwidth_formula(),
    };
    case.release()?;

    info!(
        mean_ns = measurement.timing.mean_ns,
        bandwidth = measurement.metrics.bandwidth,
        "case measured"
    );
    Ok(measurement)
}

fn measure_csr2dense<T: Element>(config: &RunConfig, device: Arc<HostDevice>) -> Result<CaseReport> {
    let timer = Arc::new(StatisticalTimer::new());
    let backend = HostDenseConversion::new(device.clone());
    let backend_name = DenseConversion::<T>::name(&backend).to_string();
    let mut case = Csr2Dense::<T, _>::new(device, backend, timer)?.with_layout(config.layout);

    let measurement = run_case(&mut case, config)?;
    let (rows, cols, nnz) = case.dimensions();
    Ok(CaseReport {
        run_id: Uuid::new_v4(),
        case: measurement.case,
        backend: backend_name,
        precision: config.precision,
        layout: config.layout,
        matrix_path: config.matrix_path.display().to_string(),
        rows,
        cols,
        nnz,
        warmup: config.warmup,
        timing: measurement.timing,
        metrics: measurement.metrics,
        gflops_formula: measurement.gflops_formula.to_string(),
        bandwidth_formula: measurement.bandwidth_formula.to_string(),
    })
}

/// Run the CSR-to-dense case at the configured precision on `device`
pub fn run_csr2dense(config: &RunConfig, device: Arc<HostDevice>) -> Result<CaseReport> {
    match config.precision {
        Precision::Single => measure_csr2dense::<f32>(config, device),
        Precision::Double => measure_csr2dense::<f64>(config, device),
    }
}

/// Build the configured device, run the case and append the CSV report
pub fn run(config: &RunConfig) -> Result<CaseReport> {
    let device = Arc::new(config.device.build());
    let report = run_csr2dense(config, device)?;
    if let Some(path) = &config.report_path {
        write_csv(path, std::slice::from_ref(&report))?;
        debug!(path = %path.display(), "report appended");
    }
    info!("{}", report.summary_line());
    Ok(report)
}
