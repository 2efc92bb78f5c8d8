//! Host-memory simulation of an accelerator device
//!
//! Allocations live in host RAM behind a mutex. Kernel launches are queued
//! and only execute when the stream is drained: on [`Device::synchronize`]
//! or before any copy/memset, matching the ordering a real device stream
//! gives. An optional capacity limit and one-shot fault injection let tests
//! exercise allocation and transfer failures.

use super::{BackendStatus, Device, DeviceOp, DevicePtr};
use bytemuck::Pod;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Queued kernel body, executed against device memory when the stream drains
pub type HostKernel = Box<dyn FnOnce(&mut HostMemory<'_>) -> Result<(), BackendStatus> + Send>;

/// One allocation, stored in 8-byte words so typed views are always aligned
struct Allocation {
    words: Vec<u64>,
    len: usize,
}

impl Allocation {
    fn new(len: usize) -> Result<Self, BackendStatus> {
        let n_words = len.div_ceil(8);
        let mut words = Vec::new();
        words
            .try_reserve_exact(n_words)
            .map_err(|_| BackendStatus::AllocationFailed)?;
        words.resize(n_words, 0);
        Ok(Self { words, len })
    }

    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }
}

/// Snapshot of device counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Total successful allocations
    pub allocations: usize,
    /// Total successful frees
    pub frees: usize,
    /// Allocations currently alive
    pub live_allocations: usize,
    /// Bytes currently allocated
    pub bytes_in_use: usize,
    /// High-water mark of `bytes_in_use`
    pub peak_bytes: usize,
    /// Kernels launched
    pub launches: usize,
    /// Kernels still queued
    pub pending_launches: usize,
    /// Explicit synchronize calls
    pub synchronizations: usize,
}

struct HostState {
    next_ptr: u64,
    allocations: HashMap<u64, Allocation>,
    pending: VecDeque<HostKernel>,
    faults: Vec<(DeviceOp, usize)>,
    stats: DeviceStats,
}

/// Mutable view of device memory handed to queued kernels
pub struct HostMemory<'a> {
    allocations: &'a mut HashMap<u64, Allocation>,
}

impl<'a> HostMemory<'a> {
    /// Typed read-only view of an allocation
    pub fn view<T: Pod>(&self, ptr: DevicePtr) -> Result<&[T], BackendStatus> {
        let alloc = self
            .allocations
            .get(&ptr.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        bytemuck::try_cast_slice(alloc.bytes()).map_err(|_| BackendStatus::InvalidValue)
    }

    /// Run `f` with a typed mutable view of `out` alongside read access to
    /// every other allocation
    pub fn with_output<T: Pod, R>(
        &mut self,
        out: DevicePtr,
        f: impl FnOnce(&HostMemory<'_>, &mut [T]) -> R,
    ) -> Result<R, BackendStatus> {
        let mut alloc = self
            .allocations
            .remove(&out.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        let result = match bytemuck::try_cast_slice_mut(alloc.bytes_mut()) {
            Ok(typed) => Ok(f(self, typed)),
            Err(_) => Err(BackendStatus::InvalidValue),
        };
        self.allocations.insert(out.0, alloc);
        result
    }
}

/// Simulated device backed by host memory
pub struct HostDevice {
    name: String,
    capacity: Option<usize>,
    state: Mutex<HostState>,
}

impl HostDevice {
    /// Unlimited simulated device
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Simulated device that refuses allocations beyond `capacity_bytes`
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self::build(Some(capacity_bytes))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            name: "host-simulated".to_string(),
            capacity,
            state: Mutex::new(HostState {
                // Leave 0 unused so a zeroed pointer is never valid
                next_ptr: 0x1000,
                allocations: HashMap::new(),
                pending: VecDeque::new(),
                faults: Vec::new(),
                stats: DeviceStats::default(),
            }),
        }
    }

    /// Capacity limit, if any
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Make the `(skip + 1)`-th subsequent call of kind `op` fail
    pub fn inject_fault(&self, op: DeviceOp, skip: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.push((op, skip));
        }
    }

    /// Current counters
    pub fn stats(&self) -> DeviceStats {
        match self.state.lock() {
            Ok(state) => {
                let mut stats = state.stats.clone();
                stats.pending_launches = state.pending.len();
                stats
            }
            Err(_) => DeviceStats::default(),
        }
    }

    /// Queue a kernel on the device stream
    ///
    /// The kernel runs later, when the stream is drained; its failure is
    /// reported by whichever call drains it.
    pub fn launch<F>(&self, kernel: F) -> Result<(), BackendStatus>
    where
        F: FnOnce(&mut HostMemory<'_>) -> Result<(), BackendStatus> + Send + 'static,
    {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::Launch)?;
        state.pending.push_back(Box::new(kernel));
        state.stats.launches += 1;
        trace!(pending = state.pending.len(), "kernel queued");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HostState>, BackendStatus> {
        self.state.lock().map_err(|_| BackendStatus::InternalError)
    }

    fn check_fault(state: &mut HostState, op: DeviceOp) -> Result<(), BackendStatus> {
        let Some(pos) = state.faults.iter().position(|(kind, _)| *kind == op) else {
            return Ok(());
        };
        if state.faults[pos].1 > 0 {
            state.faults[pos].1 -= 1;
            return Ok(());
        }
        state.faults.remove(pos);
        Err(match op {
            DeviceOp::Allocate => BackendStatus::AllocationFailed,
            DeviceOp::Launch | DeviceOp::Synchronize => BackendStatus::ExecutionFailed,
            _ => BackendStatus::InternalError,
        })
    }

    /// Execute every queued kernel in launch order
    fn drain(state: &mut HostState) -> Result<(), BackendStatus> {
        let mut first_error = None;
        while let Some(kernel) = state.pending.pop_front() {
            let mut memory = HostMemory {
                allocations: &mut state.allocations,
            };
            if let Err(status) = kernel(&mut memory) {
                first_error.get_or_insert(status);
            }
        }
        match first_error {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HostDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&self, size_bytes: usize) -> Result<DevicePtr, BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::Allocate)?;
        if let Some(capacity) = self.capacity {
            if state.stats.bytes_in_use.saturating_add(size_bytes) > capacity {
                return Err(BackendStatus::AllocationFailed);
            }
        }
        let alloc = Allocation::new(size_bytes)?;
        let ptr = state.next_ptr;
        // Keep addresses distinct even for zero-sized allocations
        state.next_ptr += (size_bytes as u64).div_ceil(256).max(1) * 256;
        state.allocations.insert(ptr, alloc);
        state.stats.allocations += 1;
        state.stats.live_allocations += 1;
        state.stats.bytes_in_use += size_bytes;
        state.stats.peak_bytes = state.stats.peak_bytes.max(state.stats.bytes_in_use);
        Ok(DevicePtr(ptr))
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::Free)?;
        Self::drain(&mut state)?;
        let alloc = state
            .allocations
            .remove(&ptr.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        state.stats.frees += 1;
        state.stats.live_allocations -= 1;
        state.stats.bytes_in_use -= alloc.len;
        Ok(())
    }

    fn copy_to_device(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::CopyToDevice)?;
        Self::drain(&mut state)?;
        let alloc = state
            .allocations
            .get_mut(&dst.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        if src.len() > alloc.len {
            return Err(BackendStatus::InvalidValue);
        }
        alloc.bytes_mut()[..src.len()].copy_from_slice(src);
        Ok(())
    }

    fn copy_from_device(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::CopyFromDevice)?;
        Self::drain(&mut state)?;
        let alloc = state
            .allocations
            .get(&src.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        if dst.len() > alloc.len {
            return Err(BackendStatus::InvalidValue);
        }
        dst.copy_from_slice(&alloc.bytes()[..dst.len()]);
        Ok(())
    }

    fn memset(&self, dst: DevicePtr, value: u8, size_bytes: usize) -> Result<(), BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::Memset)?;
        Self::drain(&mut state)?;
        let alloc = state
            .allocations
            .get_mut(&dst.0)
            .ok_or(BackendStatus::InvalidPointer)?;
        if size_bytes > alloc.len {
            return Err(BackendStatus::InvalidValue);
        }
        alloc.bytes_mut()[..size_bytes].fill(value);
        Ok(())
    }

    fn synchronize(&self) -> Result<(), BackendStatus> {
        let mut state = self.lock()?;
        Self::check_fault(&mut state, DeviceOp::Synchronize)?;
        state.stats.synchronizations += 1;
        Self::drain(&mut state)
    }
}
