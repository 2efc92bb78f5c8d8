//! Shared utilities for integration tests

#![allow(dead_code)]

pub use approx::assert_relative_eq;

use std::fs;
use std::path::PathBuf;

/// Unique path in the system temp directory
pub fn temp_path(stem: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{stem}-{}.mtx", uuid::Uuid::new_v4()))
}

/// Write `contents` to a fresh temp file and return its path
pub fn write_temp(stem: &str, contents: &str) -> PathBuf {
    let path = temp_path(stem);
    fs::write(&path, contents).expect("write temp matrix");
    path
}

/// Small general matrix used across tests
pub const SMALL_GENERAL: &str = "%%MatrixMarket matrix coordinate real general
% 3x3 with a zero middle column
3 3 4
1 1 1.0
1 3 2.0
2 2 3.0
3 1 4.0
";
