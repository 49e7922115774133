//! Write-back cache of decoded blocks.
//!
//! Direct-mapped: a block lives only in slot `index & mask`, so there is
//! at most one live cached copy of any block.  All element reads and
//! writes go through the cache; a dirty block is re-encoded into the
//! compressed buffer before its slot is reused.

use crate::block::types::Scalar;

use super::ArrayError;

const EMPTY: u64 = 0;

struct Line {
    /// Block index + 1; 0 marks an empty slot.
    tag: u64,
    dirty: bool,
}

pub(crate) struct BlockCache<T> {
    lines: Vec<Line>,
    /// Decoded scalars, `block_len` per line.
    data: Vec<T>,
    block_len: usize,
    mask: usize,
}

impl<T: Scalar> BlockCache<T> {
    /// Allocate a cache with `lines` slots (power of two) of `block_len`
    /// scalars each.  Allocation failure is reported, not aborted, so a
    /// caller can keep its previous cache.
    pub(crate) fn new(lines: usize, block_len: usize) -> Result<Self, ArrayError> {
        debug_assert!(lines.is_power_of_two());
        let mut line_vec = Vec::new();
        line_vec
            .try_reserve_exact(lines)
            .map_err(|_| ArrayError::Allocation)?;
        let mut data = Vec::new();
        data.try_reserve_exact(lines * block_len)
            .map_err(|_| ArrayError::Allocation)?;
        line_vec.extend((0..lines).map(|_| Line {
            tag: EMPTY,
            dirty: false,
        }));
        data.extend(core::iter::repeat_n(T::default(), lines * block_len));
        Ok(Self {
            lines: line_vec,
            data,
            block_len,
            mask: lines - 1,
        })
    }

    #[inline]
    pub(crate) fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Cache capacity in bytes of decoded scalars.
    pub(crate) fn capacity_bytes(&self) -> usize {
        self.data.len() * core::mem::size_of::<T>()
    }

    /// The only slot block `index` may occupy.
    #[inline]
    pub(crate) fn slot_of(&self, index: usize) -> usize {
        index & self.mask
    }

    /// Block index resident in `slot`, if any.
    #[inline]
    pub(crate) fn resident(&self, slot: usize) -> Option<usize> {
        match self.lines[slot].tag {
            EMPTY => None,
            tag => Some((tag - 1) as usize),
        }
    }

    #[inline]
    pub(crate) fn is_dirty(&self, slot: usize) -> bool {
        self.lines[slot].dirty
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self, slot: usize) {
        self.lines[slot].dirty = true;
    }

    #[inline]
    pub(crate) fn mark_clean(&mut self, slot: usize) {
        self.lines[slot].dirty = false;
    }

    /// Claim `slot` for block `index` (clean).
    pub(crate) fn claim(&mut self, slot: usize, index: usize) {
        self.lines[slot] = Line {
            tag: index as u64 + 1,
            dirty: false,
        };
    }

    /// Drop every resident block without writing anything back.
    pub(crate) fn invalidate_all(&mut self) {
        for line in &mut self.lines {
            line.tag = EMPTY;
            line.dirty = false;
        }
    }

    #[inline]
    pub(crate) fn block(&self, slot: usize) -> &[T] {
        &self.data[slot * self.block_len..(slot + 1) * self.block_len]
    }

    #[inline]
    pub(crate) fn block_mut(&mut self, slot: usize) -> &mut [T] {
        &mut self.data[slot * self.block_len..(slot + 1) * self.block_len]
    }
}
