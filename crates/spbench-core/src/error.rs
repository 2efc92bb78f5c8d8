//! Error types for the benchmark harness
//!
//! Provides a unified error type for all spbench crates. Errors fall into two
//! families that callers care about: I/O failures while loading a matrix, and
//! non-success statuses returned by the device or the numeric backend.

use crate::device::BackendStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for benchmark operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported Matrix Market input
    #[error("Could not read matrix market file {}: {reason} (line {line})", path.display())]
    MatrixMarket {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Non-success status from a device or backend call
    #[error("{operation} failed: {status}")]
    Backend {
        operation: String,
        status: BackendStatus,
    },

    /// A lifecycle phase was invoked out of order
    #[error("Cannot {operation} while case is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse error category, matching how the driver reports failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File could not be read or parsed
    Io,
    /// Device or numeric backend returned a non-success status
    Backend,
    /// The caller misused the API (bad input, wrong phase order)
    Usage,
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::MatrixMarket { .. } => ErrorKind::Io,
            Error::Backend { .. } => ErrorKind::Backend,
            Error::InvalidState { .. }
            | Error::InvalidInput(_)
            | Error::Other(_) => ErrorKind::Usage,
        }
    }

    /// Wrap a backend status with the name of the failing call
    pub fn backend(operation: impl Into<String>, status: BackendStatus) -> Self {
        Self::Backend {
            operation: operation.into(),
            status,
        }
    }

    /// Create an error for a malformed Matrix Market file
    pub fn matrix_market(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MatrixMarket {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }
}

/// Attach the failing call's name to a raw backend status
pub trait StatusExt<T> {
    /// Convert into a crate [`Result`], naming the operation on failure
    fn context(self, operation: &str) -> Result<T>;
}

impl<T> StatusExt<T> for std::result::Result<T, BackendStatus> {
    fn context(self, operation: &str) -> Result<T> {
        self.map_err(|status| Error::backend(operation, status))
    }
}
