//! Sparse (CSR) to dense conversion benchmark case
//!
//! Loads a Matrix Market file, mirrors it on the device and times one call of
//! the injected [`DenseConversion`] backend per iteration. The conversion
//! performs no floating-point arithmetic, so only a bandwidth figure is
//! reported.

use crate::backend::{
    CsrOperand, DenseConversion, DenseOperand, IndexBase, MatrixDescriptor, MatrixType,
};
use spbench_core::{
    mmio, BenchmarkCase, CaseState, CsrMatrix, DenseLayout, Device, DeviceBuffer, Element, Error,
    Index, Result, StatusExt, ThroughputMetrics, Timer, TimerId, INDEX_BYTES,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Case identifier used in reports and timer labels
pub const CASE_NAME: &str = "csr2dense";

/// Device-side mirror of the CSR input plus the dense output
struct DeviceMatrix<T: Element> {
    row_offsets: DeviceBuffer<Index>,
    col_indices: DeviceBuffer<Index>,
    values: DeviceBuffer<T>,
    dense: DeviceBuffer<T>,
}

impl<T: Element> DeviceMatrix<T> {
    /// Allocate all four buffers; any already acquired are freed on failure
    fn allocate(device: &Arc<dyn Device>, rows: usize, nnz: usize, dense_len: usize) -> Result<Self> {
        let row_offsets = DeviceBuffer::allocate(device, rows + 1, "device_row_offsets")?;
        let col_indices = DeviceBuffer::allocate(device, nnz, "device_col_indices")?;
        let values = DeviceBuffer::allocate(device, nnz, "device_values")?;
        let dense = DeviceBuffer::allocate(device, dense_len, "device_A")?;
        Ok(Self {
            row_offsets,
            col_indices,
            values,
            dense,
        })
    }

    /// Free every buffer, reporting the first failure
    ///
    /// Buffers after a failing one are still freed when dropped.
    fn release(self) -> Result<()> {
        let Self {
            row_offsets,
            col_indices,
            values,
            dense,
        } = self;
        values.release()?;
        row_offsets.release()?;
        col_indices.release()?;
        dense.release()
    }
}

/// CSR-to-dense conversion benchmark for element type `T`
pub struct Csr2Dense<T: Element, B: DenseConversion<T>> {
    device: Arc<dyn Device>,
    backend: B,
    timer: Arc<dyn Timer>,
    timer_id: TimerId,
    descriptor: MatrixDescriptor,
    layout: DenseLayout,
    state: CaseState,
    host: CsrMatrix<T>,
    n_rows: usize,
    n_cols: usize,
    n_vals: usize,
    buffers: Option<DeviceMatrix<T>>,
}

/// Single-precision case
pub type SCsr2Dense<B> = Csr2Dense<f32, B>;

/// Double-precision case
pub type DCsr2Dense<B> = Csr2Dense<f64, B>;

impl<T: Element, B: DenseConversion<T>> Csr2Dense<T, B> {
    /// Acquire a general, zero-based matrix descriptor from the backend
    ///
    /// Fails with [`Error::Backend`] if the backend refuses the descriptor.
    pub fn new(device: Arc<dyn Device>, backend: B, timer: Arc<dyn Timer>) -> Result<Self> {
        let descriptor = backend
            .create_descriptor(MatrixType::General, IndexBase::Zero)
            .context("create matrix descriptor")?;
        let timer_id = timer.register(&format!("{CASE_NAME}<{}>", T::NAME));
        debug!(backend = backend.name(), device = device.name(), precision = T::NAME, "csr2dense configured");
        Ok(Self {
            device,
            backend,
            timer,
            timer_id,
            descriptor,
            layout: DenseLayout::ColumnMajor,
            state: CaseState::Configured,
            host: CsrMatrix::zeros(0, 0),
            n_rows: 0,
            n_cols: 0,
            n_vals: 0,
            buffers: None,
        })
    }

    /// Choose the dense output layout (column-major by default)
    pub fn with_layout(mut self, layout: DenseLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> DenseLayout {
        self.layout
    }

    /// Leading dimension passed to the backend
    pub fn leading_dimension(&self) -> usize {
        self.layout.min_leading_dimension(self.n_rows, self.n_cols)
    }

    pub fn descriptor(&self) -> &MatrixDescriptor {
        &self.descriptor
    }

    /// Host copy of the loaded matrix (empty after release)
    pub fn host_matrix(&self) -> &CsrMatrix<T> {
        &self.host
    }

    /// `(rows, cols, nnz)` cached at load time
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.n_rows, self.n_cols, self.n_vals)
    }

    /// Bytes one conversion is modelled to move
    ///
    /// Column indices and values are read once per non-zero, each row offset
    /// once, the implicit column vector once (perfect caching after first
    /// touch) and the output once per row.
    pub fn bytes_moved(&self) -> usize {
        INDEX_BYTES * (self.n_vals + self.n_rows) + T::BYTES * (self.n_vals + self.n_cols + self.n_rows)
    }

    fn buffers(&self, operation: &'static str) -> Result<&DeviceMatrix<T>> {
        self.buffers.as_ref().ok_or_else(|| Error::InvalidState {
            operation,
            state: self.state.to_string(),
        })
    }

    fn buffers_mut(&mut self, operation: &'static str) -> Result<&mut DeviceMatrix<T>> {
        let state = self.state;
        self.buffers.as_mut().ok_or_else(|| Error::InvalidState {
            operation,
            state: state.to_string(),
        })
    }

    /// Download the dense output buffer
    pub fn dense_output(&self) -> Result<Vec<T>> {
        self.buffers("read dense output")?.dense.download()
    }

    /// Download the three device input sequences `(row_offsets, col_indices, values)`
    pub fn device_inputs(&self) -> Result<(Vec<Index>, Vec<Index>, Vec<T>)> {
        let buffers = self.buffers("read device inputs")?;
        Ok((
            buffers.row_offsets.download()?,
            buffers.col_indices.download()?,
            buffers.values.download()?,
        ))
    }

    /// Forget the loaded matrix and return to the configured state
    fn unload(&mut self) {
        self.host.clear();
        self.n_rows = 0;
        self.n_cols = 0;
        self.n_vals = 0;
        self.state = CaseState::Configured;
    }

    fn convert(&mut self) -> Result<()> {
        let (rows, cols) = (self.n_rows, self.n_cols);
        let ld = self.leading_dimension();
        let layout = self.layout;
        let descriptor = self.descriptor;
        let buffers = self.buffers.as_mut().ok_or_else(|| Error::InvalidState {
            operation: "run",
            state: self.state.to_string(),
        })?;
        let input = CsrOperand {
            rows,
            cols,
            values: &buffers.values,
            row_offsets: &buffers.row_offsets,
            col_indices: &buffers.col_indices,
        };
        let mut output = DenseOperand {
            buffer: &mut buffers.dense,
            ld,
            layout,
        };
        self.backend
            .csr_to_dense(&descriptor, &input, &mut output)
            .context(&format!("csr2dense<{}>", T::NAME))?;
        // Launch is asynchronous; completion must fall inside the timed region
        self.device.synchronize().context("device synchronize")
    }
}

impl<T: Element, B: DenseConversion<T>> BenchmarkCase for Csr2Dense<T, B> {
    fn name(&self) -> &str {
        CASE_NAME
    }

    fn state(&self) -> CaseState {
        self.state
    }

    fn timer(&self) -> &dyn Timer {
        self.timer.as_ref()
    }

    fn timer_id(&self) -> TimerId {
        self.timer_id
    }

    #[instrument(skip(self, _alpha, _beta), fields(case = CASE_NAME, precision = T::NAME))]
    fn setup(&mut self, _alpha: f64, _beta: f64, path: &Path) -> Result<()> {
        // Parse before touching the device so a bad file allocates nothing
        let host: CsrMatrix<T> = mmio::read_csr(path)?;

        // Drop buffers from an earlier setup before allocating new ones
        if let Some(old) = self.buffers.take() {
            self.unload();
            old.release()?;
        }

        let (rows, cols, nnz) = (host.n_rows(), host.n_cols(), host.nnz());
        let ld = self.layout.min_leading_dimension(rows, cols);
        let dense_len = self.layout.buffer_len(rows, cols, ld).ok_or_else(|| {
            Error::InvalidInput(format!("dense output of {rows}x{cols} overflows usize"))
        })?;
        match DeviceMatrix::allocate(&self.device, rows, nnz, dense_len) {
            Ok(buffers) => self.buffers = Some(buffers),
            Err(e) => {
                self.unload();
                return Err(e);
            }
        }

        self.host = host;
        self.n_rows = rows;
        self.n_cols = cols;
        self.n_vals = nnz;
        self.state = CaseState::Loaded;
        debug!(rows, cols, nnz, dense_len, "csr2dense buffers allocated");
        Ok(())
    }

    fn stage(&mut self) -> Result<()> {
        self.state.require_buffers("stage")?;
        let buffers = self.buffers.as_mut().ok_or_else(|| Error::InvalidState {
            operation: "stage",
            state: self.state.to_string(),
        })?;
        buffers.row_offsets.upload(self.host.row_offsets())?;
        buffers.col_indices.upload(self.host.col_indices())?;
        buffers.values.upload(self.host.values())?;
        buffers.dense.zero()?;
        self.state = CaseState::Staged;
        debug!("csr2dense inputs staged");
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.state.require(
            "reset",
            &[CaseState::Staged, CaseState::Ready, CaseState::Executed],
        )?;
        self.buffers_mut("reset")?.dense.zero()?;
        self.state = CaseState::Ready;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.state.require(
            "run",
            &[CaseState::Staged, CaseState::Ready, CaseState::Executed],
        )?;
        if self.state == CaseState::Executed {
            debug!("running csr2dense again without reset");
        }
        self.timer.start(self.timer_id);
        self.convert()?;
        self.timer.stop(self.timer_id);
        trace!(elapsed_ns = self.timer.elapsed_ns(self.timer_id), "csr2dense iteration");
        self.state = CaseState::Executed;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.state.require_buffers("release")?;
        let buffers = self.buffers.take().ok_or_else(|| Error::InvalidState {
            operation: "release",
            state: self.state.to_string(),
        })?;
        // Host data goes even if a free fails; the remaining buffers drop
        self.host.clear();
        self.state = CaseState::Released;
        buffers.release()?;
        debug!("csr2dense buffers released");
        Ok(())
    }

    fn gflops(&self) -> f64 {
        0.0
    }

    fn gflops_formula(&self) -> &'static str {
        "N/A"
    }

    fn bandwidth(&self) -> f64 {
        let elapsed_ns = self.timer.elapsed_ns(self.timer_id);
        if elapsed_ns > 0.0 {
            self.bytes_moved() as f64 / elapsed_ns
        } else {
            0.0
        }
    }

    fn bandwidth_formula(&self) -> &'static str {
        "GB/s"
    }

    fn throughput_metrics(&self) -> ThroughputMetrics {
        ThroughputMetrics {
            gflops: self.gflops(),
            bandwidth: self.bandwidth(),
            elapsed_ns: self.timer.elapsed_ns(self.timer_id),
            bytes_moved: self.bytes_moved(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostDenseConversion;
    use spbench_core::{HostDevice, StatisticalTimer};

    fn case() -> (Arc<HostDevice>, Arc<StatisticalTimer>, SCsr2Dense<HostDenseConversion>) {
        let host = Arc::new(HostDevice::new());
        let timer = Arc::new(StatisticalTimer::new());
        let case = Csr2Dense::new(host.clone(), HostDenseConversion::new(host.clone()), timer.clone()).unwrap();
        (host, timer, case)
    }

    #[test]
    fn test_new_is_configured() {
        let (_, _, case) = case();
        assert_eq!(case.state(), CaseState::Configured);
        assert_eq!(case.name(), "csr2dense");
        assert_eq!(case.layout(), DenseLayout::ColumnMajor);
        assert_eq!(*case.descriptor(), MatrixDescriptor::default());
    }

    #[test]
    fn test_phases_out_of_order() {
        let (_, _, mut case) = case();
        assert!(matches!(case.stage(), Err(Error::InvalidState { operation: "stage", .. })));
        assert!(matches!(case.reset(), Err(Error::InvalidState { operation: "reset", .. })));
        assert!(matches!(case.run(), Err(Error::InvalidState { operation: "run", .. })));
        assert!(matches!(case.release(), Err(Error::InvalidState { operation: "release", .. })));
        assert!(case.dense_output().is_err());
    }

    #[test]
    fn test_gflops_is_zero() {
        let (_, _, case) = case();
        assert_eq!(case.gflops(), 0.0);
        assert_eq!(case.gflops_formula(), "N/A");
        assert_eq!(case.bandwidth_formula(), "GB/s");
        // Nothing timed yet
        assert_eq!(case.bandwidth(), 0.0);
    }
}
