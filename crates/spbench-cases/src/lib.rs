//! Benchmark cases for sparse primitives
//!
//! Each case owns its host and device data and drives one injected numeric
//! backend through the [`BenchmarkCase`](spbench_core::BenchmarkCase) phases.
//!
//! # Example
//!
//! ```rust,no_run
//! use spbench_cases::{backend::HostDenseConversion, Csr2Dense};
//! use spbench_core::{BenchmarkCase, HostDevice, StatisticalTimer};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let device = Arc::new(HostDevice::new());
//! let timer = Arc::new(StatisticalTimer::new());
//! let backend = HostDenseConversion::new(device.clone());
//! let mut case = Csr2Dense::<f32, _>::new(device, backend, timer)?;
//!
//! case.setup(1.0, 0.0, Path::new("matrix.mtx"))?;
//! case.stage()?;
//! case.reset()?;
//! case.run()?;
//! println!("{:.3} {}", case.bandwidth(), case.bandwidth_formula());
//! case.release()?;
//! # Ok::<(), spbench_core::Error>(())
//! ```

pub mod backend;
pub mod csr2dense;

pub use backend::{DenseConversion, HostDenseConversion, IndexBase, MatrixDescriptor, MatrixType};
pub use csr2dense::{Csr2Dense, DCsr2Dense, SCsr2Dense, CASE_NAME};
