//! Host-side compressed sparse row matrices
//!
//! `CsrMatrix` holds the three parallel sequences that are staged on the
//! device: row offsets, column indices and non-zero values. Construction
//! validates the structural invariants so downstream kernels can index
//! without re-checking.

use crate::error::{Error, Result};
use crate::numeric::{to_index, Element, Index};
use serde::{Deserialize, Serialize};

/// Storage order of a dense matrix buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenseLayout {
    /// Element (r, c) lives at `c * ld + r`
    #[default]
    ColumnMajor,
    /// Element (r, c) lives at `r * ld + c`
    RowMajor,
}

impl DenseLayout {
    /// Smallest valid leading dimension for a `rows x cols` matrix
    pub fn min_leading_dimension(self, rows: usize, cols: usize) -> usize {
        match self {
            DenseLayout::ColumnMajor => rows,
            DenseLayout::RowMajor => cols,
        }
    }

    /// Linear offset of element (row, col)
    #[inline]
    pub fn offset(self, row: usize, col: usize, ld: usize) -> usize {
        match self {
            DenseLayout::ColumnMajor => col * ld + row,
            DenseLayout::RowMajor => row * ld + col,
        }
    }

    /// Number of elements a buffer needs for this layout, `None` on overflow
    pub fn buffer_len(self, rows: usize, cols: usize, ld: usize) -> Option<usize> {
        match self {
            DenseLayout::ColumnMajor => ld.checked_mul(cols),
            DenseLayout::RowMajor => ld.checked_mul(rows),
        }
    }
}

/// Sparse matrix in compressed sparse row form
///
/// # Examples
///
/// ```
/// use spbench_core::csr::{CsrMatrix, DenseLayout};
///
/// // 3x3 with two non-zeros
/// let m = CsrMatrix::<f32>::from_triplets(3, 3, &[(0, 1, 2.0), (2, 0, 5.0)]).unwrap();
/// assert_eq!(m.row_offsets(), &[0, 1, 1, 2]);
/// assert_eq!(m.nnz(), 2);
///
/// let dense = m.to_dense(DenseLayout::RowMajor);
/// assert_eq!(dense, vec![0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T: Element> {
    n_rows: usize,
    n_cols: usize,
    row_offsets: Vec<Index>,
    col_indices: Vec<Index>,
    values: Vec<T>,
}

impl<T: Element> CsrMatrix<T> {
    /// Create a matrix from raw CSR sequences
    ///
    /// Fails if the sequences violate CSR structure (see [`CsrMatrix::validate`]).
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_offsets: Vec<Index>,
        col_indices: Vec<Index>,
        values: Vec<T>,
    ) -> Result<Self> {
        let m = Self {
            n_rows,
            n_cols,
            row_offsets,
            col_indices,
            values,
        };
        m.validate()?;
        Ok(m)
    }

    /// Empty `n_rows x n_cols` matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_offsets: vec![0; n_rows + 1],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from zero-based `(row, col, value)` triplets
    ///
    /// Entries are sorted by (row, col); duplicates are summed.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        if to_index(n_rows).is_none() || to_index(n_cols).is_none() {
            return Err(Error::InvalidInput(format!(
                "Shape {n_rows}x{n_cols} exceeds index range"
            )));
        }
        let mut entries = triplets.to_vec();
        for &(r, c, _) in &entries {
            if r >= n_rows || c >= n_cols {
                return Err(Error::InvalidInput(format!(
                    "Entry ({r}, {c}) out of bounds for {n_rows}x{n_cols} matrix"
                )));
            }
        }
        entries.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut counts = vec![0usize; n_rows];
        let mut col_indices = Vec::with_capacity(entries.len());
        let mut values: Vec<T> = Vec::with_capacity(entries.len());
        let mut last: Option<(usize, usize)> = None;

        for (r, c, v) in entries {
            if last == Some((r, c)) {
                if let Some(tail) = values.last_mut() {
                    *tail = *tail + v;
                }
                continue;
            }
            let col = to_index(c).ok_or_else(|| Error::InvalidInput(format!("Column {c} exceeds index range")))?;
            col_indices.push(col);
            values.push(v);
            counts[r] += 1;
            last = Some((r, c));
        }

        let mut row_offsets = Vec::with_capacity(n_rows + 1);
        let mut acc = 0usize;
        row_offsets.push(0);
        for count in counts {
            acc += count;
            row_offsets.push(
                to_index(acc).ok_or_else(|| Error::InvalidInput(format!("nnz {acc} exceeds index range")))?,
            );
        }

        Self::new(n_rows, n_cols, row_offsets, col_indices, values)
    }

    /// Check CSR structural invariants
    ///
    /// - `row_offsets.len() == n_rows + 1`, starting at 0 and non-decreasing
    /// - last offset equals the number of non-zeros
    /// - column indices and values have the same length
    /// - every column index lies in `[0, n_cols)`
    pub fn validate(&self) -> Result<()> {
        if self.row_offsets.len() != self.n_rows + 1 {
            return Err(Error::size_mismatch(
                self.n_rows + 1,
                self.row_offsets.len(),
                "row offsets",
            ));
        }
        if self.col_indices.len() != self.values.len() {
            return Err(Error::size_mismatch(
                self.col_indices.len(),
                self.values.len(),
                "values",
            ));
        }
        if self.row_offsets[0] != 0 {
            return Err(Error::InvalidInput(format!(
                "First row offset must be 0, got {}",
                self.row_offsets[0]
            )));
        }
        if let Some(w) = self.row_offsets.windows(2).find(|w| w[1] < w[0]) {
            return Err(Error::InvalidInput(format!(
                "Row offsets must be non-decreasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        let last = self.row_offsets[self.n_rows] as usize;
        if last != self.values.len() {
            return Err(Error::size_mismatch(last, self.values.len(), "non-zero count"));
        }
        if let Some(&c) = self
            .col_indices
            .iter()
            .find(|&&c| c < 0 || c as usize >= self.n_cols)
        {
            return Err(Error::InvalidInput(format!(
                "Column index {c} out of bounds for {} columns",
                self.n_cols
            )));
        }
        Ok(())
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored non-zeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Check if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row_offsets(&self) -> &[Index] {
        &self.row_offsets
    }

    pub fn col_indices(&self) -> &[Index] {
        &self.col_indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Iterate over `(row, col, value)` of stored entries in CSR order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.n_rows).flat_map(move |r| {
            let start = self.row_offsets[r] as usize;
            let end = self.row_offsets[r + 1] as usize;
            (start..end).map(move |k| (r, self.col_indices[k] as usize, self.values[k]))
        })
    }

    /// Reference dense expansion with the minimal leading dimension
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn to_dense(&self, layout: DenseLayout) -> Vec<T> {
        let ld = layout.min_leading_dimension(self.n_rows, self.n_cols);
        let len = layout
            .buffer_len(self.n_rows, self.n_cols, ld)
            .expect("dense size overflows usize");
        let mut dense = vec![T::zero(); len];
        for (r, c, v) in self.iter() {
            dense[layout.offset(r, c, ld)] = v;
        }
        dense
    }

    /// Drop all stored sequences, keeping nothing but an empty shape
    pub fn clear(&mut self) {
        self.n_rows = 0;
        self.n_cols = 0;
        self.row_offsets.clear();
        self.row_offsets.push(0);
        self.col_indices.clear();
        self.values.clear();
    }
}
