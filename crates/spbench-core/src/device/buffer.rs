//! Typed device allocations with scoped ownership
//!
//! A `DeviceBuffer` frees its allocation when dropped, so a setup phase that
//! fails halfway never leaks the buffers it already acquired. Callers that
//! need free failures reported use [`DeviceBuffer::release`] instead.

use super::{Device, DevicePtr};
use crate::error::{Error, Result, StatusExt};
use bytemuck::Pod;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owned allocation of `len` elements of `T` on a device
pub struct DeviceBuffer<T: Pod> {
    device: Arc<dyn Device>,
    ptr: DevicePtr,
    len: usize,
    name: String,
    live: bool,
    _marker: PhantomData<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Allocate room for `len` elements
    ///
    /// `name` identifies the buffer in error messages and logs.
    pub fn allocate(device: &Arc<dyn Device>, len: usize, name: &str) -> Result<Self> {
        let size_bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| Error::InvalidInput(format!("{name}: {len} elements overflow usize")))?;
        let ptr = device
            .allocate(size_bytes)
            .context(&format!("allocate {name}"))?;
        debug!(buffer = name, %ptr, size_bytes, "allocated device buffer");
        Ok(Self {
            device: Arc::clone(device),
            ptr,
            len,
            name: name.to_string(),
            live: true,
            _marker: PhantomData,
        })
    }

    /// Device address of the first element
    #[inline]
    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy a host slice of exactly `len` elements to the device
    pub fn upload(&mut self, data: &[T]) -> Result<()> {
        if data.len() != self.len {
            return Err(Error::size_mismatch(self.len, data.len(), &self.name));
        }
        self.device
            .copy_to_device(bytemuck::cast_slice(data), self.ptr)
            .context(&format!("copy {} to device", self.name))
    }

    /// Copy the whole buffer back to the host
    pub fn download(&self) -> Result<Vec<T>> {
        let mut host = vec![T::zeroed(); self.len];
        self.device
            .copy_from_device(self.ptr, bytemuck::cast_slice_mut(&mut host))
            .context(&format!("copy {} from device", self.name))?;
        Ok(host)
    }

    /// Fill the buffer with zero bytes
    pub fn zero(&mut self) -> Result<()> {
        self.device
            .memset(self.ptr, 0, self.size_bytes())
            .context(&format!("memset {}", self.name))
    }

    /// Free the allocation, reporting failure instead of logging it
    pub fn release(mut self) -> Result<()> {
        self.live = false;
        self.device
            .free(self.ptr)
            .context(&format!("free {}", self.name))?;
        debug!(buffer = %self.name, ptr = %self.ptr, "released device buffer");
        Ok(())
    }
}

impl<T: Pod> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        if let Err(status) = self.device.free(self.ptr) {
            warn!(buffer = %self.name, ptr = %self.ptr, %status, "failed to free device buffer on drop");
        }
    }
}

impl<T: Pod> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("name", &self.name)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("device", &self.device.name())
            .finish()
    }
}
