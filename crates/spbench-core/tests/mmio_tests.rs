//! Integration tests for loading Matrix Market files from disk

mod common;

use common::{assert_relative_eq, temp_path, write_temp, SMALL_GENERAL};
use spbench_core::{mmio, CsrMatrix, DenseLayout, Error, ErrorKind};
use std::fs;

#[test]
fn loads_general_file() {
    let path = write_temp("general", SMALL_GENERAL);
    let m: CsrMatrix<f64> = mmio::read_csr(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!((m.n_rows(), m.n_cols(), m.nnz()), (3, 3, 4));
    assert_eq!(m.row_offsets(), &[0, 2, 3, 4]);
    assert_eq!(m.col_indices(), &[0, 2, 1, 0]);
    assert_eq!(m.values(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(
        m.to_dense(DenseLayout::RowMajor),
        vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 0.0, 0.0]
    );
}

#[test]
fn single_precision_rounds_values() {
    let path = write_temp(
        "single",
        "%%MatrixMarket matrix coordinate real general\n1 2 2\n1 1 0.1\n1 2 1e-3\n",
    );
    let m: CsrMatrix<f32> = mmio::read_csr(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_relative_eq!(m.values()[0], 0.1f32);
    assert_relative_eq!(m.values()[1], 1e-3f32);
}

#[test]
fn symmetric_file_is_expanded() {
    let path = write_temp(
        "symmetric",
        "%%MatrixMarket matrix coordinate real symmetric\n3 3 3\n1 1 2.0\n3 1 5.0\n2 2 1.0\n",
    );
    let m: CsrMatrix<f64> = mmio::read_csr(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(m.nnz(), 4);
    assert_eq!(
        m.to_dense(DenseLayout::RowMajor),
        vec![2.0, 0.0, 5.0, 0.0, 1.0, 0.0, 5.0, 0.0, 0.0]
    );
}

#[test]
fn missing_file_is_io_error() {
    let path = temp_path("does-not-exist");
    let err = mmio::read_csr::<f32>(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn malformed_entry_reports_path_and_line() {
    let path = write_temp(
        "malformed",
        "%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 1.0\n2 x 1.0\n",
    );
    let err = mmio::read_csr::<f64>(&path).unwrap_err();
    fs::remove_file(&path).ok();
    match err {
        Error::MatrixMarket { path: reported, line, .. } => {
            assert_eq!(reported, path);
            assert_eq!(line, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn written_file_reloads_identically() {
    let m = CsrMatrix::from_triplets(
        4,
        5,
        &[(0, 4, 1.5), (1, 0, -2.0), (3, 3, 0.25), (3, 1, 8.0)],
    )
    .unwrap();
    let path = temp_path("written");
    mmio::write_csr(&path, &m).unwrap();
    let back: CsrMatrix<f64> = mmio::read_csr(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(back, m);
}
