//! # spbench
//!
//! Benchmark harness for sparse linear-algebra primitives on accelerator
//! devices.
//!
//! The workspace is split into:
//!
//! - [`spbench_core`]: CSR data, Matrix Market reader, device abstraction,
//!   timers and the [`BenchmarkCase`] contract
//! - [`spbench_cases`]: numeric backends and the cases built on them
//!
//! This crate adds run configuration, the driver and reports.
//!
//! ## Example
//!
//! ```rust,no_run
//! use spbench::{run, Precision, RunConfig};
//!
//! let config = RunConfig::for_matrix("data/bcsstk01.mtx").with_precision(Precision::Double);
//! let report = run(&config)?;
//! println!("{}", report.summary_line());
//! # Ok::<(), spbench::Error>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod report;

pub use spbench_cases;
pub use spbench_core;

pub use config::{HostDeviceConfig, Precision, RunConfig};
pub use driver::{run, run_case, run_csr2dense, Measurement};
pub use error::{Error, Result};
pub use report::{write_csv, CaseReport};

pub use spbench_cases::{Csr2Dense, DCsr2Dense, HostDenseConversion, SCsr2Dense};
pub use spbench_core::{BenchmarkCase, CsrMatrix, DenseLayout, HostDevice, StatisticalTimer};

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a human-readable subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init();
}

/// Install a JSON subscriber filtered by `RUST_LOG`
pub fn init_tracing_json() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .try_init();
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{run, run_case, CaseReport, Precision, RunConfig};
    pub use spbench_core::prelude::*;
}
