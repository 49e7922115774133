//! Fixed-rate compressed arrays with mutable element access.
//!
//! A [`CompressedArray`] presents the illusion of a dense d-dimensional
//! array while storing every 4^d block at a fixed, word-aligned bit
//! budget.  Element access goes through a small write-back cache of
//! decoded blocks; a decoded scalar only exists while its block is
//! cached, so references and pointers into the array are proxy handles
//! (array + flat index) that re-enter the cache on every dereference
//! instead of pinning memory.
//!
//! The cache is interior-mutable (reads decode blocks, writes mark them
//! dirty), which makes the array deliberately `!Sync`: concurrent access
//! must be serialized by the owner, matching the single-writer cache
//! design.

mod cache;
mod iter;
mod pointer;
mod reference;

pub use iter::BlockIter;
pub use pointer::ElemPtr;
pub use reference::ElemRef;

use core::cell::RefCell;
use core::fmt;

use tracing::trace;

use crate::bitstream::{BitRead, BitReader, BitStream};
use crate::block::decode::decode_block;
use crate::block::encode::encode_block;
use crate::block::types::{block_size, Scalar};
use crate::codec::Codec;
use crate::driver;
use crate::field::Field;

use cache::BlockCache;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by compressed-array construction and reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayError {
    /// A dimension is zero or the dimension count is unsupported.
    InvalidDimensions,
    /// The requested rate cannot be realized with byte-addressable,
    /// word-aligned blocks.
    InvalidRate,
    /// Allocation failed; the array keeps its previous state.
    Allocation,
    /// A bulk transfer buffer does not match the array size.
    SizeMismatch,
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayError::InvalidDimensions => f.write_str("invalid array dimensions"),
            ArrayError::InvalidRate => f.write_str("rate incompatible with block addressing"),
            ArrayError::Allocation => f.write_str("allocation failed"),
            ArrayError::SizeMismatch => f.write_str("buffer size does not match array size"),
        }
    }
}

impl std::error::Error for ArrayError {}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

struct Store<T> {
    /// Compressed blocks, `bits_per_block / 8` bytes each.
    buffer: Vec<u8>,
    cache: BlockCache<T>,
}

/// A d-dimensional array of scalars compressed at a fixed rate.
pub struct CompressedArray<T: Scalar, const D: usize> {
    dims: [usize; D],
    /// Blocks along each axis.
    bc: [usize; D],
    bits_per_block: usize,
    codec: Codec,
    store: RefCell<Store<T>>,
}

impl<T: Scalar, const D: usize> CompressedArray<T, D> {
    // ── Construction ─────────────────────────────────────────────────────

    /// Create a zero-initialized array of `dims` at `rate` bits per value
    /// (rounded up to the word-aligned granularity).
    pub fn new(dims: [usize; D], rate: f64) -> Result<Self, ArrayError> {
        assert!(D >= 1 && D <= 4, "dimensionality out of range");
        if dims.iter().any(|&n| n == 0) {
            return Err(ArrayError::InvalidDimensions);
        }
        let mut codec = Codec::new();
        codec.set_rate(rate, D, true);
        let bits_per_block = codec.maxbits() as usize;
        if bits_per_block % 8 != 0 {
            return Err(ArrayError::InvalidRate);
        }
        let bc: [usize; D] = core::array::from_fn(|i| dims[i].div_ceil(4));
        let nblocks: usize = bc.iter().product();

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(nblocks * bits_per_block / 8)
            .map_err(|_| ArrayError::Allocation)?;
        buffer.resize(nblocks * bits_per_block / 8, 0);

        let cache = BlockCache::new(Self::default_cache_lines(&bc), block_size(D))?;
        Ok(Self {
            dims,
            bc,
            bits_per_block,
            codec,
            store: RefCell::new(Store { buffer, cache }),
        })
    }

    /// Create an array and bulk-load `data` (row-major, x fastest).
    pub fn with_data(dims: [usize; D], rate: f64, data: &[T]) -> Result<Self, ArrayError> {
        let mut arr = Self::new(dims, rate)?;
        arr.set_data(data)?;
        Ok(arr)
    }

    /// Default cache: two layers of blocks (a layer spans all axes but
    /// the last), rounded up to a power of two.
    fn default_cache_lines(bc: &[usize; D]) -> usize {
        let layer: usize = bc[..D - 1].iter().product();
        (2 * layer).max(4).next_power_of_two()
    }

    // ── Geometry ─────────────────────────────────────────────────────────

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Per-axis sizes.
    pub fn dims(&self) -> [usize; D] {
        self.dims
    }

    pub fn size_x(&self) -> usize {
        self.dims[0]
    }
    pub fn size_y(&self) -> usize {
        debug_assert!(D >= 2);
        self.dims[1]
    }
    pub fn size_z(&self) -> usize {
        debug_assert!(D >= 3);
        self.dims[2]
    }
    pub fn size_w(&self) -> usize {
        debug_assert!(D >= 4);
        self.dims[3]
    }

    /// Rate in bits per value.
    pub fn rate(&self) -> f64 {
        self.bits_per_block as f64 / block_size(D) as f64
    }

    pub(crate) fn block_count(&self) -> usize {
        self.bc.iter().product()
    }

    /// Split a coordinate tuple into (block index, in-block offset).
    fn locate(&self, coords: [usize; D]) -> (usize, usize) {
        let mut block = 0usize;
        let mut offset = 0usize;
        for axis in (0..D).rev() {
            assert!(coords[axis] < self.dims[axis], "index out of bounds");
            block = block * self.bc[axis] + coords[axis] / 4;
            offset |= (coords[axis] % 4) << (2 * axis);
        }
        (block, offset)
    }

    /// Flat index (row-major, x fastest) of a coordinate tuple.
    pub(crate) fn flatten(&self, coords: [usize; D]) -> usize {
        let mut flat = 0usize;
        for axis in (0..D).rev() {
            flat = flat * self.dims[axis] + coords[axis];
        }
        flat
    }

    /// Coordinates of a flat index.
    pub(crate) fn unflatten(&self, mut flat: usize) -> [usize; D] {
        let mut coords = [0usize; D];
        for axis in 0..D {
            coords[axis] = flat % self.dims[axis];
            flat /= self.dims[axis];
        }
        coords
    }

    // ── Cache plumbing ───────────────────────────────────────────────────

    fn write_back(&self, store: &mut Store<T>, slot: usize, block_index: usize) {
        let Store { buffer, cache } = store;
        trace!(block_index, slot, "write back dirty block");
        let mut bs = BitStream::new(buffer);
        bs.wseek(block_index * self.bits_per_block);
        encode_block(&self.codec, &mut bs, cache.block(slot));
        bs.flush();
        cache.mark_clean(slot);
    }

    /// Make `block_index` resident and return its slot, evicting (and
    /// writing back if dirty) whatever held the slot before.
    fn fetch(&self, store: &mut Store<T>, block_index: usize) -> usize {
        let slot = store.cache.slot_of(block_index);
        if store.cache.resident(slot) == Some(block_index) {
            return slot;
        }
        if let Some(old) = store.cache.resident(slot) {
            if store.cache.is_dirty(slot) {
                self.write_back(store, slot, old);
            }
        }
        let Store { buffer, cache } = store;
        let mut bs = BitReader::new(buffer);
        bs.rseek(block_index * self.bits_per_block);
        decode_block(&self.codec, &mut bs, cache.block_mut(slot));
        cache.claim(slot, block_index);
        slot
    }

    // ── Element access ───────────────────────────────────────────────────

    /// Read the element at `coords`.
    pub fn get(&self, coords: [usize; D]) -> T {
        let (block, offset) = self.locate(coords);
        let mut store = self.store.borrow_mut();
        let slot = self.fetch(&mut store, block);
        store.cache.block(slot)[offset]
    }

    /// Write the element at `coords`.  The compressed buffer is not
    /// touched until the block is evicted or the cache flushed.
    ///
    /// Writes go through the interior-mutable cache so proxy references
    /// can assign through a shared borrow; the array is `!Sync`, which
    /// keeps this single-threaded.
    pub fn set(&self, coords: [usize; D], value: T) {
        let (block, offset) = self.locate(coords);
        let mut store = self.store.borrow_mut();
        let slot = self.fetch(&mut store, block);
        store.cache.block_mut(slot)[offset] = value;
        store.cache.mark_dirty(slot);
    }

    /// Read by flat (row-major) index.
    pub fn get_flat(&self, index: usize) -> T {
        self.get(self.unflatten(index))
    }

    /// Write by flat (row-major) index.
    pub fn set_flat(&self, index: usize, value: T) {
        self.set(self.unflatten(index), value);
    }

    // ── Proxies ──────────────────────────────────────────────────────────

    /// Proxy reference to the element at `coords`.
    pub fn at(&self, coords: [usize; D]) -> ElemRef<'_, T, D> {
        ElemRef::new(self, self.flatten(coords))
    }

    /// Proxy pointer to the element at flat index `index`.
    pub fn ptr(&self, index: usize) -> ElemPtr<'_, T, D> {
        ElemPtr::new(self, index as isize)
    }

    /// Block-order iterator over all elements: every cell of a block is
    /// visited before the next block, so writes made through the yielded
    /// references cluster on the cached block.
    pub fn iter(&self) -> BlockIter<'_, T, D> {
        BlockIter::new(self)
    }

    // ── Bulk transfers ───────────────────────────────────────────────────

    /// Bulk-load: compress `data` (row-major) into the array, discarding
    /// any cached state.
    pub fn set_data(&mut self, data: &[T]) -> Result<(), ArrayError> {
        if data.len() != self.size() {
            return Err(ArrayError::SizeMismatch);
        }
        let field_dims = self.field_dims();
        let store = self.store.get_mut();
        store.cache.invalidate_all();
        let field = Field::from_slice(data, field_dims)
            .map_err(|_| ArrayError::SizeMismatch)?;
        driver::compress(&self.codec, &field, &mut store.buffer)
            .map_err(|_| ArrayError::SizeMismatch)?;
        Ok(())
    }

    /// Bulk-decode the whole array into `out` (row-major), including any
    /// cached dirty state.
    pub fn get_data(&self, out: &mut [T]) -> Result<(), ArrayError> {
        if out.len() != self.size() {
            return Err(ArrayError::SizeMismatch);
        }
        self.flush_cache();
        let store = self.store.borrow();
        let mut field = Field::from_slice_mut(out, self.field_dims())
            .map_err(|_| ArrayError::SizeMismatch)?;
        driver::decompress(&self.codec, &mut field, &store.buffer)
            .map_err(|_| ArrayError::SizeMismatch)?;
        Ok(())
    }

    fn field_dims(&self) -> [usize; 4] {
        let mut dims = [0usize; 4];
        dims[..D].copy_from_slice(&self.dims);
        dims
    }

    // ── Compressed storage ───────────────────────────────────────────────

    /// Flush the cache and expose the compressed buffer.
    pub fn compressed_data(&mut self) -> &[u8] {
        self.flush_cache();
        &self.store.get_mut().buffer
    }

    /// Flush the cache and return the compressed size in bytes.
    pub fn compressed_size(&mut self) -> usize {
        self.flush_cache();
        self.store.get_mut().buffer.len()
    }

    /// Overwrite the compressed buffer with externally produced block
    /// data (same dimensions and rate), discarding all cached state.
    pub fn load_compressed(&mut self, data: &[u8]) -> Result<(), ArrayError> {
        let store = self.store.get_mut();
        if data.len() != store.buffer.len() {
            return Err(ArrayError::SizeMismatch);
        }
        store.buffer.copy_from_slice(data);
        store.cache.invalidate_all();
        Ok(())
    }

    // ── Cache control ────────────────────────────────────────────────────

    /// Cache capacity in bytes.
    pub fn cache_size(&self) -> usize {
        self.store.borrow().cache.capacity_bytes()
    }

    /// Re-encode every dirty cached block into the compressed buffer.
    pub fn flush_cache(&self) {
        let mut store = self.store.borrow_mut();
        for slot in 0..store.cache.line_count() {
            if let Some(block_index) = store.cache.resident(slot) {
                if store.cache.is_dirty(slot) {
                    self.write_back(&mut store, slot, block_index);
                }
            }
        }
    }

    /// Discard every cached block, dirty or not, without writing back.
    /// Only sound when the compressed buffer is about to be (or was just)
    /// replaced wholesale.
    pub fn clear_cache(&self) {
        self.store.borrow_mut().cache.invalidate_all();
    }

    /// Resize the cache to approximately `bytes` (rounded up to a
    /// power-of-two line count); 0 restores the default.  Dirty blocks
    /// are flushed first; on allocation failure the previous cache is
    /// kept.
    pub fn set_cache_size(&mut self, bytes: usize) -> Result<(), ArrayError> {
        self.flush_cache();
        let block_len = block_size(D);
        let lines = if bytes == 0 {
            Self::default_cache_lines(&self.bc)
        } else {
            (bytes / (block_len * core::mem::size_of::<T>()))
                .max(1)
                .next_power_of_two()
        };
        let cache = BlockCache::new(lines, block_len)?;
        self.store.get_mut().cache = cache;
        Ok(())
    }

    // ── Reconfiguration ──────────────────────────────────────────────────

    /// Change the rate.  Destructive: the array contents become
    /// unspecified (the buffer is zeroed).  Fails — leaving the array
    /// untouched — when the new rate cannot produce byte-addressable
    /// blocks or the buffer cannot be allocated.
    pub fn set_rate(&mut self, rate: f64) -> Result<f64, ArrayError> {
        let mut codec = self.codec;
        let effective = codec.set_rate(rate, D, true);
        let bits_per_block = codec.maxbits() as usize;
        if bits_per_block % 8 != 0 {
            return Err(ArrayError::InvalidRate);
        }
        let bytes = self.block_count() * bits_per_block / 8;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|_| ArrayError::Allocation)?;
        buffer.resize(bytes, 0);

        let store = self.store.get_mut();
        store.buffer = buffer;
        store.cache.invalidate_all();
        self.codec = codec;
        self.bits_per_block = bits_per_block;
        Ok(effective)
    }

    /// Resize the array.  Destructive when the capacity changes: contents
    /// are zeroed (`clear` additionally guarantees zeroing even at equal
    /// capacity).  On allocation failure the previous state is kept.
    pub fn resize(&mut self, dims: [usize; D], clear: bool) -> Result<(), ArrayError> {
        if dims.iter().any(|&n| n == 0) {
            return Err(ArrayError::InvalidDimensions);
        }
        let bc: [usize; D] = core::array::from_fn(|i| dims[i].div_ceil(4));
        let nblocks: usize = bc.iter().product();
        let bytes = nblocks * self.bits_per_block / 8;

        let store = self.store.get_mut();
        if bytes != store.buffer.len() {
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(bytes)
                .map_err(|_| ArrayError::Allocation)?;
            buffer.resize(bytes, 0);
            store.buffer = buffer;
        } else if clear {
            store.buffer.fill(0);
        }
        let cache = BlockCache::new(Self::default_cache_lines(&bc), block_size(D))?;
        store.cache = cache;
        self.dims = dims;
        self.bc = bc;
        Ok(())
    }
}

impl<T: Scalar, const D: usize> fmt::Debug for CompressedArray<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedArray")
            .field("dims", &self.dims)
            .field("rate", &self.rate())
            .field("blocks", &self.block_count())
            .finish()
    }
}
