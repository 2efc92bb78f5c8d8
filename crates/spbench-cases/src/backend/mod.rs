//! Numeric backends for sparse-to-dense conversion
//!
//! A backend is the capability boundary around a vendor conversion primitive.
//! Cases receive one by injection and never look inside: they hand it device
//! buffers and a matrix descriptor, and get a status back.

pub mod host;

pub use host::HostDenseConversion;

use bytemuck::Pod;
use spbench_core::{BackendStatus, DenseLayout, DeviceBuffer, Element, Index};

/// Structural class of the stored matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixType {
    General,
    Symmetric,
    Hermitian,
    Triangular,
}

/// Index base of the stored row offsets and column indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBase {
    #[default]
    Zero,
    One,
}

impl IndexBase {
    /// Value subtracted from stored indices to get zero-based positions
    #[inline]
    pub fn value(self) -> Index {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }
}

/// Matrix descriptor passed with every conversion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixDescriptor {
    pub matrix_type: MatrixType,
    pub index_base: IndexBase,
}

impl Default for MatrixDescriptor {
    fn default() -> Self {
        Self {
            matrix_type: MatrixType::General,
            index_base: IndexBase::Zero,
        }
    }
}

/// CSR input already resident on the device
pub struct CsrOperand<'a, T: Pod> {
    pub rows: usize,
    pub cols: usize,
    pub values: &'a DeviceBuffer<T>,
    pub row_offsets: &'a DeviceBuffer<Index>,
    pub col_indices: &'a DeviceBuffer<Index>,
}

/// Dense output region on the device
pub struct DenseOperand<'a, T: Pod> {
    pub buffer: &'a mut DeviceBuffer<T>,
    /// Leading dimension in elements
    pub ld: usize,
    pub layout: DenseLayout,
}

/// Sparse (CSR) to dense conversion primitive
///
/// `csr_to_dense` only enqueues work; callers must synchronize the device
/// before reading the output or stopping a timer.
pub trait DenseConversion<T: Element>: Send + Sync {
    /// Name of this backend
    fn name(&self) -> &str;

    /// Acquire a descriptor for matrices of the given class and index base
    fn create_descriptor(
        &self,
        matrix_type: MatrixType,
        index_base: IndexBase,
    ) -> Result<MatrixDescriptor, BackendStatus>;

    /// Expand `input` into `output`, writing zeros where no entry is stored
    fn csr_to_dense(
        &self,
        descr: &MatrixDescriptor,
        input: &CsrOperand<'_, T>,
        output: &mut DenseOperand<'_, T>,
    ) -> Result<(), BackendStatus>;
}

/// Argument checks shared by conversion backends
pub(crate) fn validate_operands<T: Pod>(
    input: &CsrOperand<'_, T>,
    output: &DenseOperand<'_, T>,
) -> Result<(), BackendStatus> {
    if output.ld < output.layout.min_leading_dimension(input.rows, input.cols) {
        return Err(BackendStatus::InvalidValue);
    }
    let required = output
        .layout
        .buffer_len(input.rows, input.cols, output.ld)
        .ok_or(BackendStatus::InvalidValue)?;
    if output.buffer.len() < required {
        return Err(BackendStatus::InvalidValue);
    }
    if input.row_offsets.len() != input.rows + 1 {
        return Err(BackendStatus::InvalidValue);
    }
    if input.values.len() != input.col_indices.len() {
        return Err(BackendStatus::InvalidValue);
    }
    Ok(())
}
