//! Shared utilities for case integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spbench_core::{mmio, CsrMatrix, Element};
use std::path::{Path, PathBuf};

/// Matrix Market file removed when dropped
pub struct TempMatrix {
    path: PathBuf,
}

impl TempMatrix {
    /// Write raw Matrix Market text
    pub fn from_text(text: &str) -> Self {
        let path = Self::fresh_path();
        std::fs::write(&path, text).expect("write temp matrix");
        Self { path }
    }

    /// Write an in-memory matrix
    pub fn from_matrix<T: Element>(matrix: &CsrMatrix<T>) -> Self {
        let path = Self::fresh_path();
        mmio::write_csr(&path, matrix).expect("write temp matrix");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fresh_path() -> PathBuf {
        std::env::temp_dir().join(format!("spbench-{}.mtx", uuid::Uuid::new_v4()))
    }
}

impl Drop for TempMatrix {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// The 3x3 matrix [[1,0,2],[0,3,0],[4,0,0]]
pub const SMALL_3X3: &str = "%%MatrixMarket matrix coordinate real general
3 3 4
1 1 1.0
1 3 2.0
2 2 3.0
3 1 4.0
";

/// Random sparse matrix with values in [-1, 1)
pub fn random_matrix(rows: usize, cols: usize, density: f64, seed: u64) -> CsrMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triplets = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if rng.gen_bool(density) {
                triplets.push((r, c, rng.gen_range(-1.0..1.0)));
            }
        }
    }
    CsrMatrix::from_triplets(rows, cols, &triplets).expect("valid triplets")
}
