//! Uniform contract implemented by every benchmark case
//!
//! The driver calls the phases in a fixed order:
//!
//! ```text
//! setup -> initialize_cpu -> stage -> (reset -> run)* -> read_back -> release
//! ```
//!
//! Only `run` is timed. Cases track their own [`CaseState`] and reject phases
//! invoked out of order with [`Error::InvalidState`](crate::Error::InvalidState).

use crate::error::{Error, Result};
use crate::timer::{Timer, TimerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Lifecycle state of a benchmark case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseState {
    /// Constructed, backend resources acquired, nothing loaded
    Configured,
    /// Host matrix loaded and device buffers allocated
    Loaded,
    /// Inputs uploaded, output cleared
    Staged,
    /// Output cleared since the last run
    Ready,
    /// Measured call completed
    Executed,
    /// Buffers freed and host data cleared
    Released,
}

impl CaseState {
    /// States in which device buffers exist
    fn has_buffers(self) -> bool {
        matches!(
            self,
            CaseState::Loaded | CaseState::Staged | CaseState::Ready | CaseState::Executed
        )
    }

    /// Fail with [`Error::InvalidState`] unless device buffers exist
    pub fn require_buffers(self, operation: &'static str) -> Result<()> {
        if self.has_buffers() {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.to_string(),
            })
        }
    }

    /// Fail with [`Error::InvalidState`] unless `self` is one of `allowed`
    pub fn require(self, operation: &'static str, allowed: &[CaseState]) -> Result<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.to_string(),
            })
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Derived performance figures for one case
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThroughputMetrics {
    /// Giga floating-point operations per second (0 when not meaningful)
    pub gflops: f64,
    /// Estimated sustained bandwidth, bytes per nanosecond
    pub bandwidth: f64,
    /// Mean duration of one measured call
    pub elapsed_ns: f64,
    /// Bytes the bandwidth model assumes one call moves
    pub bytes_moved: usize,
}

/// Phase contract shared by all benchmark cases
pub trait BenchmarkCase {
    /// Short identifier, e.g. `"csr2dense"`
    fn name(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> CaseState;

    /// Timer `run` records into
    fn timer(&self) -> &dyn Timer;

    /// Series of [`timer`](Self::timer) that `run` records into
    fn timer_id(&self) -> TimerId;

    /// Load inputs from `path` and allocate device buffers
    ///
    /// `alpha` and `beta` are the scaling coefficients used by cases that
    /// compute `alpha * op + beta * y`; other cases ignore them.
    fn setup(&mut self, alpha: f64, beta: f64, path: &Path) -> Result<()>;

    /// Prepare host-side buffers
    fn initialize_cpu(&mut self) -> Result<()> {
        Ok(())
    }

    /// Upload inputs and clear outputs on the device
    fn stage(&mut self) -> Result<()>;

    /// Clear device outputs before another measured call
    fn reset(&mut self) -> Result<()>;

    /// Execute one measured call, including device completion
    fn run(&mut self) -> Result<()>;

    /// Copy results back to the host
    fn read_back(&mut self) -> Result<()> {
        Ok(())
    }

    /// Free device buffers and clear host data
    fn release(&mut self) -> Result<()>;

    fn gflops(&self) -> f64;

    fn gflops_formula(&self) -> &'static str;

    fn bandwidth(&self) -> f64;

    fn bandwidth_formula(&self) -> &'static str;

    /// All derived figures at once
    fn throughput_metrics(&self) -> ThroughputMetrics;
}
