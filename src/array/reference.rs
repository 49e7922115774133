//! Proxy reference into a compressed array.
//!
//! A decoded scalar exists only while its block is cached, so a reference
//! cannot be a plain address.  It is a (array, flat index) pair that
//! re-enters the cache on every access; nothing is locked or pinned.

use crate::block::types::Scalar;

use super::CompressedArray;

/// Proxy reference to one element of a [`CompressedArray`].
pub struct ElemRef<'a, T: Scalar, const D: usize> {
    arr: &'a CompressedArray<T, D>,
    flat: usize,
}

impl<'a, T: Scalar, const D: usize> ElemRef<'a, T, D> {
    pub(crate) fn new(arr: &'a CompressedArray<T, D>, flat: usize) -> Self {
        Self { arr, flat }
    }

    /// Decode and return the referenced value.
    pub fn get(&self) -> T {
        self.arr.get_flat(self.flat)
    }

    /// Store `value`, marking the containing block dirty in the cache.
    pub fn set(&self, value: T) {
        self.arr.set_flat(self.flat, value);
    }

    /// Copy the value of `other` into `self` (get + set).
    pub fn assign_from(&self, other: &ElemRef<'_, T, D>) {
        self.set(other.get());
    }

    /// Flat (row-major) index of the referenced element.
    #[inline]
    pub fn index(&self) -> usize {
        self.flat
    }

    /// Multi-axis coordinates of the referenced element.
    pub fn coords(&self) -> [usize; D] {
        self.arr.unflatten(self.flat)
    }

    /// x coordinate.
    pub fn i(&self) -> usize {
        self.coords()[0]
    }
    /// y coordinate (2D and up).
    pub fn j(&self) -> usize {
        self.coords()[1]
    }
    /// z coordinate (3D and up).
    pub fn k(&self) -> usize {
        self.coords()[2]
    }
    /// w coordinate (4D).
    pub fn l(&self) -> usize {
        self.coords()[3]
    }
}

impl<T: Scalar, const D: usize> Clone for ElemRef<'_, T, D> {
    fn clone(&self) -> Self {
        Self {
            arr: self.arr,
            flat: self.flat,
        }
    }
}

impl<T: Scalar, const D: usize> core::fmt::Debug for ElemRef<'_, T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElemRef").field("flat", &self.flat).finish()
    }
}
