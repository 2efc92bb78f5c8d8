//! Element types that can be staged on a device
//!
//! Values cross the host/device boundary as raw bytes, so every element type
//! must be plain-old-data. Only floating-point types are wired up because the
//! conversion backends operate on real-valued matrices.

use bytemuck::Pod;
use num_traits::{Float, NumCast};
use std::fmt::{Debug, Display};

/// Column/row index type used by CSR structures on host and device
///
/// Four bytes wide; bandwidth estimates count index traffic with this size.
pub type Index = i32;

/// Size in bytes of one [`Index`]
pub const INDEX_BYTES: usize = std::mem::size_of::<Index>();

/// Base trait for matrix element types
pub trait Element: Pod + Float + Debug + Display + Send + Sync + 'static {
    /// Short precision tag used in reports ("f32", "f64")
    const NAME: &'static str;

    /// Size of one element in bytes
    const BYTES: usize = std::mem::size_of::<Self>();

    /// Convert from f64, saturating to the nearest representable value
    fn from_f64(value: f64) -> Self;

    /// Widen to f64
    fn as_f64(self) -> f64;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// Convert a host length to an [`Index`], failing if it does not fit
pub fn to_index(value: usize) -> Option<Index> {
    <Index as NumCast>::from(value)
}
