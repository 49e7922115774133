//! Field metadata: the description of an uncompressed array.
//!
//! A field carries the element type, up to four dimensions (0 = absent),
//! per-axis strides in scalars (negative strides walk an axis backwards),
//! and a base pointer into caller-owned memory.  The field never owns the
//! data it points at; drop order between a field and its buffer is the
//! caller's concern, enforced by the borrow in the safe constructors.

use core::marker::PhantomData;

use crate::block::types::{Scalar, MAX_DIMS};
use crate::codec::CodecError;

/// Description of a strided, caller-owned scalar array.
///
/// The lifetime ties the field to the borrow it was built from; fields
/// built from raw pointers use the `'static` escape hatch and carry their
/// own safety contract.
#[derive(Debug)]
pub struct Field<'a, T: Scalar> {
    data: *mut T,
    dims: [usize; MAX_DIMS],
    strides: [isize; MAX_DIMS],
    _borrow: PhantomData<&'a mut [T]>,
}

impl<'a, T: Scalar> Field<'a, T> {
    /// Row-major strides (x fastest) for `dims`.
    fn contiguous_strides(dims: &[usize; MAX_DIMS]) -> [isize; MAX_DIMS] {
        let mut strides = [0isize; MAX_DIMS];
        let mut s = 1isize;
        for (stride, &n) in strides.iter_mut().zip(dims.iter()) {
            if n == 0 {
                break;
            }
            *stride = s;
            s *= n as isize;
        }
        strides
    }

    fn checked(dims: [usize; MAX_DIMS], len: usize) -> Result<(), CodecError> {
        // Present dimensions must be contiguous from x up.
        let d = dims.iter().take_while(|&&n| n > 0).count();
        if d == 0 || d > MAX_DIMS || dims.iter().skip(d).any(|&n| n > 0) {
            return Err(CodecError::InvalidConfig);
        }
        let total: usize = dims.iter().take(d).product();
        if len < total {
            return Err(CodecError::InvalidConfig);
        }
        Ok(())
    }

    /// Read-only field over a contiguous row-major slice.
    ///
    /// Fails when the dimensions are empty, leave gaps, or describe more
    /// elements than `data` holds.
    pub fn from_slice(data: &'a [T], dims: [usize; MAX_DIMS]) -> Result<Self, CodecError> {
        Self::checked(dims, data.len())?;
        Ok(Self {
            data: data.as_ptr() as *mut T,
            strides: Self::contiguous_strides(&dims),
            dims,
            _borrow: PhantomData,
        })
    }

    /// Mutable field over a contiguous row-major slice (decompression
    /// target).
    pub fn from_slice_mut(data: &'a mut [T], dims: [usize; MAX_DIMS]) -> Result<Self, CodecError> {
        Self::checked(dims, data.len())?;
        Ok(Self {
            data: data.as_mut_ptr(),
            strides: Self::contiguous_strides(&dims),
            dims,
            _borrow: PhantomData,
        })
    }

    /// Field over raw parts with explicit strides.
    ///
    /// # Safety
    /// Every element reachable through `dims`/`strides` from `ptr` must be
    /// valid for reads (and for writes when the field is a decompression
    /// target) for the lifetime of the field, and must not be aliased by a
    /// conflicting mutable access.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        dims: [usize; MAX_DIMS],
        strides: [isize; MAX_DIMS],
    ) -> Self {
        Self {
            data: ptr,
            dims,
            strides,
            _borrow: PhantomData,
        }
    }

    /// Replace the per-axis strides.
    ///
    /// # Safety
    /// The new strides must keep every reachable element inside the memory
    /// the field was constructed over.
    pub unsafe fn set_strides(&mut self, strides: [isize; MAX_DIMS]) {
        self.strides = strides;
    }

    /// Number of present dimensions (1..=4).
    #[inline]
    pub fn dimensionality(&self) -> usize {
        self.dims.iter().take_while(|&&n| n > 0).count()
    }

    /// Per-axis sizes; absent axes are 0.
    #[inline]
    pub fn dims(&self) -> [usize; MAX_DIMS] {
        self.dims
    }

    /// Per-axis strides in scalars.
    #[inline]
    pub fn strides(&self) -> [isize; MAX_DIMS] {
        self.strides
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.dims.iter().take(self.dimensionality()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks along each present axis.
    pub(crate) fn block_counts(&self) -> [usize; MAX_DIMS] {
        let mut bc = [0usize; MAX_DIMS];
        for (b, &n) in bc.iter_mut().zip(self.dims.iter()) {
            *b = n.div_ceil(4);
        }
        bc
    }

    /// Total number of blocks.
    pub(crate) fn block_count(&self) -> usize {
        self.block_counts()
            .iter()
            .take(self.dimensionality())
            .product()
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *const T {
        self.data
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&self) -> *mut T {
        self.data
    }
}
