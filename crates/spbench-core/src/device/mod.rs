//! Accelerator device abstraction
//!
//! This module provides the seam between benchmark cases and whatever owns
//! device memory:
//! - `Device`: raw allocate / copy / memset / free / synchronize calls that
//!   report failures as a [`BackendStatus`], mirroring a driver API
//! - `DeviceBuffer`: typed, RAII-managed allocation on a device
//! - `HostDevice`: a host-memory simulation with stream-ordered kernel
//!   launches, used by the reference backend and the test suite

pub mod buffer;
pub mod host;

pub use buffer::DeviceBuffer;
pub use host::{DeviceStats, HostDevice, HostMemory};

use std::fmt;

/// Opaque device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(pub u64);

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Non-success status returned by a device or numeric backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    /// Out of device memory or allocation refused
    AllocationFailed,
    /// An argument was out of range (size, leading dimension, ...)
    InvalidValue,
    /// Address is not a live allocation on this device
    InvalidPointer,
    /// Operation or descriptor combination is not supported
    NotSupported,
    /// A launched kernel failed while executing
    ExecutionFailed,
    /// Device-side bookkeeping failed
    InternalError,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BackendStatus::AllocationFailed => "device allocation failed",
            BackendStatus::InvalidValue => "invalid value",
            BackendStatus::InvalidPointer => "invalid device pointer",
            BackendStatus::NotSupported => "operation not supported",
            BackendStatus::ExecutionFailed => "kernel execution failed",
            BackendStatus::InternalError => "internal device error",
        };
        f.write_str(text)
    }
}

impl std::error::Error for BackendStatus {}

/// Kinds of device calls, used for statistics and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    Allocate,
    Free,
    CopyToDevice,
    CopyFromDevice,
    Memset,
    Synchronize,
    Launch,
}

/// Driver-level operations on a single accelerator device
///
/// All calls are synchronous with respect to the caller except kernel
/// launches, which backends enqueue through their own device handles.
/// Copies and memsets are ordered after previously launched work.
pub trait Device: Send + Sync {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Allocate `size_bytes` of device memory
    fn allocate(&self, size_bytes: usize) -> Result<DevicePtr, BackendStatus>;

    /// Release an allocation
    fn free(&self, ptr: DevicePtr) -> Result<(), BackendStatus>;

    /// Copy host bytes into the start of an allocation
    fn copy_to_device(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendStatus>;

    /// Copy the start of an allocation into host bytes
    fn copy_from_device(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendStatus>;

    /// Fill the first `size_bytes` of an allocation with `value`
    fn memset(&self, dst: DevicePtr, value: u8, size_bytes: usize) -> Result<(), BackendStatus>;

    /// Block until all launched work has completed
    fn synchronize(&self) -> Result<(), BackendStatus>;
}
