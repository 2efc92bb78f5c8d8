//! Run configuration
//!
//! A [`RunConfig`] is usually loaded from JSON; every field has a default, so
//! a file only needs to name the matrix:
//!
//! ```json
//! { "matrix_path": "data/bcsstk01.mtx", "precision": "double", "iterations": 50 }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use spbench_core::{DenseLayout, HostDevice};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Floating-point precision of the case under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => write!(f, "single"),
            Precision::Double => write!(f, "double"),
        }
    }
}

/// Simulated device settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostDeviceConfig {
    /// Refuse allocations beyond this many bytes
    pub capacity_bytes: Option<usize>,
}

impl HostDeviceConfig {
    pub fn build(&self) -> HostDevice {
        match self.capacity_bytes {
            Some(capacity) => HostDevice::with_capacity(capacity),
            None => HostDevice::new(),
        }
    }
}

/// Parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Matrix Market input
    pub matrix_path: PathBuf,
    /// Measured calls
    pub iterations: usize,
    /// Untimed calls before measuring
    pub warmup: usize,
    pub alpha: f64,
    pub beta: f64,
    pub precision: Precision,
    /// Layout of the dense output
    pub layout: DenseLayout,
    /// Append a CSV row here when set
    pub report_path: Option<PathBuf>,
    pub device: HostDeviceConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            matrix_path: PathBuf::new(),
            iterations: 10,
            warmup: 1,
            alpha: 1.0,
            beta: 0.0,
            precision: Precision::Single,
            layout: DenseLayout::ColumnMajor,
            report_path: None,
            device: HostDeviceConfig::default(),
        }
    }
}

impl RunConfig {
    /// Configuration for `path` with every other field defaulted
    pub fn for_matrix(path: impl Into<PathBuf>) -> Self {
        Self {
            matrix_path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_layout(mut self, layout: DenseLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_iterations(mut self, warmup: usize, iterations: usize) -> Self {
        self.warmup = warmup;
        self.iterations = iterations;
        self
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a measurement
    pub fn validate(&self) -> Result<()> {
        if self.matrix_path.as_os_str().is_empty() {
            return Err(Error::Config("matrix_path is required".to_string()));
        }
        if self.iterations == 0 {
            return Err(Error::Config("iterations must be at least 1".to_string()));
        }
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(Error::Config(format!(
                "alpha and beta must be finite, got {} and {}",
                self.alpha, self.beta
            )));
        }
        Ok(())
    }
}
