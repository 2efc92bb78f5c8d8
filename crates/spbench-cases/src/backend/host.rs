//! Reference conversion backend running on the simulated host device
//!
//! Generic over the element type, so both the single- and double-precision
//! variants are available. The expansion is queued on the [`HostDevice`]
//! stream like a real kernel launch.

use super::{
    validate_operands, CsrOperand, DenseConversion, DenseOperand, IndexBase, MatrixDescriptor,
    MatrixType,
};
use spbench_core::{BackendStatus, DenseLayout, Element, HostDevice, Index};
use std::sync::Arc;
use tracing::trace;

/// CSR-to-dense conversion executed on a [`HostDevice`]
#[derive(Clone)]
pub struct HostDenseConversion {
    device: Arc<HostDevice>,
}

impl HostDenseConversion {
    pub fn new(device: Arc<HostDevice>) -> Self {
        Self { device }
    }

    /// Device this backend launches on
    pub fn device(&self) -> &Arc<HostDevice> {
        &self.device
    }
}

impl<T: Element> DenseConversion<T> for HostDenseConversion {
    fn name(&self) -> &str {
        "host-reference"
    }

    fn create_descriptor(
        &self,
        matrix_type: MatrixType,
        index_base: IndexBase,
    ) -> Result<MatrixDescriptor, BackendStatus> {
        // Only general storage has a meaningful dense expansion here
        if matrix_type != MatrixType::General {
            return Err(BackendStatus::NotSupported);
        }
        Ok(MatrixDescriptor {
            matrix_type,
            index_base,
        })
    }

    fn csr_to_dense(
        &self,
        descr: &MatrixDescriptor,
        input: &CsrOperand<'_, T>,
        output: &mut DenseOperand<'_, T>,
    ) -> Result<(), BackendStatus> {
        if descr.matrix_type != MatrixType::General {
            return Err(BackendStatus::NotSupported);
        }
        validate_operands(input, output)?;

        let shape = Shape {
            rows: input.rows,
            cols: input.cols,
            ld: output.ld,
            layout: output.layout,
            base: descr.index_base.value(),
        };
        let values = input.values.ptr();
        let row_offsets = input.row_offsets.ptr();
        let col_indices = input.col_indices.ptr();
        let dense = output.buffer.ptr();
        trace!(rows = shape.rows, cols = shape.cols, ld = shape.ld, "launching csr2dense");

        self.device.launch(move |mem| {
            mem.with_output::<T, _>(dense, |mem, out| -> Result<(), BackendStatus> {
                let offsets = mem.view::<Index>(row_offsets)?;
                let cols = mem.view::<Index>(col_indices)?;
                let vals = mem.view::<T>(values)?;
                expand(&shape, offsets, cols, vals, out)
            })?
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    rows: usize,
    cols: usize,
    ld: usize,
    layout: DenseLayout,
    base: Index,
}

/// Zero-based `[start, end)` range of row `r` within the value arrays
fn row_range(offsets: &[Index], r: usize, base: Index, nnz: usize) -> Result<(usize, usize), BackendStatus> {
    let start = offsets[r] - base;
    let end = offsets[r + 1] - base;
    if start < 0 || end < start || end as usize > nnz {
        return Err(BackendStatus::ExecutionFailed);
    }
    Ok((start as usize, end as usize))
}

fn column(cols: &[Index], k: usize, base: Index, n_cols: usize) -> Result<usize, BackendStatus> {
    let c = cols[k] - base;
    if c < 0 || c as usize >= n_cols {
        return Err(BackendStatus::ExecutionFailed);
    }
    Ok(c as usize)
}

#[cfg(not(feature = "parallel"))]
fn expand<T: Element>(
    shape: &Shape,
    offsets: &[Index],
    cols: &[Index],
    vals: &[T],
    out: &mut [T],
) -> Result<(), BackendStatus> {
    clear_region(shape, out);
    for r in 0..shape.rows {
        let (start, end) = row_range(offsets, r, shape.base, vals.len())?;
        for k in start..end {
            let c = column(cols, k, shape.base, shape.cols)?;
            out[shape.layout.offset(r, c, shape.ld)] = vals[k];
        }
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn expand<T: Element>(
    shape: &Shape,
    offsets: &[Index],
    cols: &[Index],
    vals: &[T],
    out: &mut [T],
) -> Result<(), BackendStatus> {
    use rayon::prelude::*;

    match shape.layout {
        // Rows are contiguous, so each row can be filled independently
        DenseLayout::RowMajor => out
            .par_chunks_mut(shape.ld.max(1))
            .take(shape.rows)
            .enumerate()
            .try_for_each(|(r, row)| {
                row[..shape.cols].fill(T::zero());
                let (start, end) = row_range(offsets, r, shape.base, vals.len())?;
                for k in start..end {
                    row[column(cols, k, shape.base, shape.cols)?] = vals[k];
                }
                Ok(())
            }),
        // Bucket entries by column first so each column strip fills independently
        DenseLayout::ColumnMajor => {
            let mut by_column: Vec<Vec<(usize, usize)>> = vec![Vec::new(); shape.cols];
            for r in 0..shape.rows {
                let (start, end) = row_range(offsets, r, shape.base, vals.len())?;
                for k in start..end {
                    by_column[column(cols, k, shape.base, shape.cols)?].push((r, k));
                }
            }
            out.par_chunks_mut(shape.ld.max(1))
                .take(shape.cols)
                .zip(by_column.par_iter())
                .for_each(|(strip, entries)| {
                    strip[..shape.rows].fill(T::zero());
                    for &(r, k) in entries {
                        strip[r] = vals[k];
                    }
                });
            Ok(())
        }
    }
}

/// Zero the `rows x cols` region, leaving leading-dimension padding untouched
#[cfg(not(feature = "parallel"))]
fn clear_region<T: Element>(shape: &Shape, out: &mut [T]) {
    let (outer, inner) = match shape.layout {
        DenseLayout::ColumnMajor => (shape.cols, shape.rows),
        DenseLayout::RowMajor => (shape.rows, shape.cols),
    };
    for i in 0..outer {
        out[i * shape.ld..i * shape.ld + inner].fill(T::zero());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spbench_core::{CsrMatrix, Device, DeviceBuffer};

    struct Staged<T: Element> {
        values: DeviceBuffer<T>,
        row_offsets: DeviceBuffer<Index>,
        col_indices: DeviceBuffer<Index>,
    }

    fn stage<T: Element>(device: &Arc<dyn Device>, m: &CsrMatrix<T>) -> Staged<T> {
        let mut values = DeviceBuffer::allocate(device, m.nnz(), "values").unwrap();
        let mut row_offsets = DeviceBuffer::allocate(device, m.n_rows() + 1, "row_offsets").unwrap();
        let mut col_indices = DeviceBuffer::allocate(device, m.nnz(), "col_indices").unwrap();
        values.upload(m.values()).unwrap();
        row_offsets.upload(m.row_offsets()).unwrap();
        col_indices.upload(m.col_indices()).unwrap();
        Staged {
            values,
            row_offsets,
            col_indices,
        }
    }

    fn convert<T: Element>(m: &CsrMatrix<T>, layout: DenseLayout, ld: usize, descr: MatrixDescriptor) -> Result<Vec<T>, BackendStatus> {
        let host = Arc::new(HostDevice::new());
        let device: Arc<dyn Device> = host.clone();
        let backend = HostDenseConversion::new(host);
        let staged = stage(&device, m);
        let len = layout.buffer_len(m.n_rows(), m.n_cols(), ld).unwrap();
        let mut dense = DeviceBuffer::<T>::allocate(&device, len, "dense").unwrap();
        let input = CsrOperand {
            rows: m.n_rows(),
            cols: m.n_cols(),
            values: &staged.values,
            row_offsets: &staged.row_offsets,
            col_indices: &staged.col_indices,
        };
        let mut output = DenseOperand {
            buffer: &mut dense,
            ld,
            layout,
        };
        backend.csr_to_dense(&descr, &input, &mut output)?;
        device.synchronize()?;
        Ok(dense.download().unwrap())
    }

    #[test]
    fn test_small_matrix_both_layouts() {
        let m = CsrMatrix::<f32>::from_triplets(3, 3, &[(0, 1, 2.0), (2, 0, 5.0)]).unwrap();
        let descr = MatrixDescriptor::default();
        assert_eq!(
            convert(&m, DenseLayout::RowMajor, 3, descr).unwrap(),
            vec![0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0]
        );
        assert_eq!(
            convert(&m, DenseLayout::ColumnMajor, 3, descr).unwrap(),
            vec![0.0, 0.0, 5.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_double_precision_variant() {
        let m = CsrMatrix::<f64>::from_triplets(2, 4, &[(0, 3, 1e-300), (1, 1, -7.5)]).unwrap();
        let dense = convert(&m, DenseLayout::RowMajor, 4, MatrixDescriptor::default()).unwrap();
        assert_eq!(dense, m.to_dense(DenseLayout::RowMajor));
    }

    #[test]
    fn test_padded_leading_dimension() {
        let m = CsrMatrix::<f32>::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 2.0)]).unwrap();
        // ld = 3: one padding element per column stays untouched (zero from allocation)
        let dense = convert(&m, DenseLayout::ColumnMajor, 3, MatrixDescriptor::default()).unwrap();
        assert_eq!(dense, vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_one_based_indices() {
        // Stored indices are one-based; the matrix is built raw to keep them
        let m = CsrMatrix::<f32>::from_triplets(2, 2, &[(0, 1, 3.0)]).unwrap();
        let host = Arc::new(HostDevice::new());
        let device: Arc<dyn Device> = host.clone();
        let backend = HostDenseConversion::new(host);
        let mut values = DeviceBuffer::allocate(&device, 1, "values").unwrap();
        let mut row_offsets = DeviceBuffer::allocate(&device, 3, "row_offsets").unwrap();
        let mut col_indices = DeviceBuffer::allocate(&device, 1, "col_indices").unwrap();
        values.upload(&[3.0f32]).unwrap();
        row_offsets.upload(&[1, 2, 2]).unwrap();
        col_indices.upload(&[2]).unwrap();
        let mut dense = DeviceBuffer::<f32>::allocate(&device, 4, "dense").unwrap();

        let descr = DenseConversion::<f32>::create_descriptor(&backend, MatrixType::General, IndexBase::One).unwrap();
        let input = CsrOperand {
            rows: 2,
            cols: 2,
            values: &values,
            row_offsets: &row_offsets,
            col_indices: &col_indices,
        };
        let mut output = DenseOperand {
            buffer: &mut dense,
            ld: 2,
            layout: DenseLayout::RowMajor,
        };
        backend.csr_to_dense(&descr, &input, &mut output).unwrap();
        device.synchronize().unwrap();
        assert_eq!(dense.download().unwrap(), m.to_dense(DenseLayout::RowMajor));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let m = CsrMatrix::<f32>::from_triplets(3, 2, &[(0, 0, 1.0)]).unwrap();
        // ld smaller than rows for column-major
        assert_eq!(
            convert(&m, DenseLayout::ColumnMajor, 2, MatrixDescriptor::default()),
            Err(BackendStatus::InvalidValue)
        );
        let symmetric = MatrixDescriptor {
            matrix_type: MatrixType::Symmetric,
            index_base: IndexBase::Zero,
        };
        assert_eq!(
            convert(&m, DenseLayout::ColumnMajor, 3, symmetric),
            Err(BackendStatus::NotSupported)
        );
    }

    #[test]
    fn test_descriptor_support() {
        let backend = HostDenseConversion::new(Arc::new(HostDevice::new()));
        let d = DenseConversion::<f32>::create_descriptor(&backend, MatrixType::General, IndexBase::Zero).unwrap();
        assert_eq!(d, MatrixDescriptor::default());
        assert_eq!(
            DenseConversion::<f32>::create_descriptor(&backend, MatrixType::Triangular, IndexBase::Zero),
            Err(BackendStatus::NotSupported)
        );
    }

    #[test]
    fn test_corrupt_indices_fail_on_synchronize() {
        let host = Arc::new(HostDevice::new());
        let device: Arc<dyn Device> = host.clone();
        let backend = HostDenseConversion::new(host);
        let mut values = DeviceBuffer::allocate(&device, 1, "values").unwrap();
        let mut row_offsets = DeviceBuffer::allocate(&device, 2, "row_offsets").unwrap();
        let mut col_indices = DeviceBuffer::allocate(&device, 1, "col_indices").unwrap();
        values.upload(&[1.0f32]).unwrap();
        row_offsets.upload(&[0, 1]).unwrap();
        col_indices.upload(&[9]).unwrap();
        let mut dense = DeviceBuffer::<f32>::allocate(&device, 2, "dense").unwrap();
        let input = CsrOperand {
            rows: 1,
            cols: 2,
            values: &values,
            row_offsets: &row_offsets,
            col_indices: &col_indices,
        };
        let mut output = DenseOperand {
            buffer: &mut dense,
            ld: 1,
            layout: DenseLayout::ColumnMajor,
        };
        // The launch itself succeeds; the failure shows up when the stream drains
        backend
            .csr_to_dense(&MatrixDescriptor::default(), &input, &mut output)
            .unwrap();
        assert_eq!(device.synchronize(), Err(BackendStatus::ExecutionFailed));
    }

    #[test]
    fn test_wide_column_major_with_padding() {
        // Many column strips, several entries per column, padded leading dimension
        let triplets: Vec<(usize, usize, f64)> = (0..40)
            .flat_map(|c| (0..5).map(move |r| ((r * 7 + c) % 9, c, (r * 100 + c) as f64 + 0.5)))
            .collect();
        let m = CsrMatrix::from_triplets(9, 40, &triplets).unwrap();
        let dense = convert(&m, DenseLayout::ColumnMajor, 11, MatrixDescriptor::default()).unwrap();
        let reference = m.to_dense(DenseLayout::ColumnMajor);
        assert_eq!(dense.len(), 11 * 40);
        for c in 0..40 {
            let strip = &dense[c * 11..(c + 1) * 11];
            assert_eq!(&strip[..9], &reference[c * 9..(c + 1) * 9]);
            assert_eq!(&strip[9..], &[0.0, 0.0]);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn matrices() -> impl Strategy<Value = CsrMatrix<f64>> {
            (1usize..12, 1usize..12).prop_flat_map(|(rows, cols)| {
                prop::collection::vec((0..rows, 0..cols, -100.0f64..100.0), 0..40)
                    .prop_map(move |t| CsrMatrix::from_triplets(rows, cols, &t).unwrap())
            })
        }

        proptest! {
            #[test]
            fn prop_matches_reference_expansion(m in matrices(), pad in 0usize..3) {
                for layout in [DenseLayout::ColumnMajor, DenseLayout::RowMajor] {
                    let ld = layout.min_leading_dimension(m.n_rows(), m.n_cols());
                    let dense = convert(&m, layout, ld, MatrixDescriptor::default()).unwrap();
                    prop_assert_eq!(dense, m.to_dense(layout));

                    // Padding never receives a value
                    let padded = convert(&m, layout, ld + pad, MatrixDescriptor::default()).unwrap();
                    for (r, c, v) in m.iter() {
                        prop_assert_eq!(padded[layout.offset(r, c, ld + pad)], v);
                    }
                    let stored: f64 = padded.iter().map(|v| v.abs()).sum();
                    let expected: f64 = m.values().iter().map(|v| v.abs()).sum();
                    prop_assert!((stored - expected).abs() <= 1e-9 * expected.max(1.0));
                }
            }
        }
    }
}
