//! Core traits and types for the sparse-primitive benchmark harness
//!
//! This crate provides the pieces every benchmark case is built from.
//!
//! # Architecture Overview
//!
//! 1. **Host data** - [`CsrMatrix`] and the Matrix Market reader in [`mmio`]
//! 2. **Device** - the [`Device`] trait, RAII [`DeviceBuffer`]s and the
//!    [`HostDevice`] simulation
//! 3. **Measurement** - the [`Timer`] collaborator and the
//!    [`BenchmarkCase`] phase contract
//!
//! # Example
//!
//! ```rust
//! use spbench_core::{Device, DeviceBuffer, HostDevice};
//! use std::sync::Arc;
//!
//! let device: Arc<dyn Device> = Arc::new(HostDevice::new());
//! let mut buf = DeviceBuffer::<f32>::allocate(&device, 3, "example").unwrap();
//! buf.upload(&[1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(buf.download().unwrap(), vec![1.0, 2.0, 3.0]);
//! ```

pub mod case;
pub mod csr;
pub mod device;
pub mod error;
pub mod mmio;
pub mod numeric;
pub mod timer;

// Re-export core types
pub use error::{Error, ErrorKind, Result, StatusExt};

pub use case::{BenchmarkCase, CaseState, ThroughputMetrics};
pub use csr::{CsrMatrix, DenseLayout};
pub use device::{
    BackendStatus, Device, DeviceBuffer, DeviceOp, DevicePtr, DeviceStats, HostDevice, HostMemory,
};
pub use numeric::{Element, Index, INDEX_BYTES};
pub use timer::{StatisticalTimer, Timer, TimerId, TimingSummary};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkCase, CaseState, CsrMatrix, DenseLayout, Device, DeviceBuffer, Element, Error,
        HostDevice, Result, StatisticalTimer, Timer,
    };
}
