//! Errors surfaced by the driver

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Driver-level error
#[derive(Error, Debug)]
pub enum Error {
    /// A case, device or reader failure
    #[error(transparent)]
    Case(#[from] spbench_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Report serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV report failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias using the driver error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Category of the underlying case error, if any
    pub fn case_kind(&self) -> Option<spbench_core::ErrorKind> {
        match self {
            Error::Case(e) => Some(e.kind()),
            _ => None,
        }
    }
}
