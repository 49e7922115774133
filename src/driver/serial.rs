//! Serial block traversal: gather → encode and decode → scatter over a
//! strided field, in row-major block order (x fastest).

use crate::bitstream::{BitRead, BitStream};
use crate::block::decode::decode_block;
use crate::block::encode::encode_block;
use crate::block::types::{block_size, pad_line, Scalar, MAX_BLOCK_SIZE};
use crate::codec::{Codec, Mode};
use crate::field::Field;

// ─────────────────────────────────────────────────────────────────────────────
// Block traversal
// ─────────────────────────────────────────────────────────────────────────────

/// Visit all block coordinates in row-major block order.
pub(crate) fn for_each_block<const D: usize>(bc: [usize; D], mut f: impl FnMut([usize; D])) {
    let mut b = [0usize; D];
    loop {
        f(b);
        let mut axis = 0;
        loop {
            b[axis] += 1;
            if b[axis] < bc[axis] {
                break;
            }
            b[axis] = 0;
            axis += 1;
            if axis == D {
                return;
            }
        }
    }
}

/// Recover block coordinates from a linear block index (row-major,
/// x fastest) — the same order [`for_each_block`] visits.
pub(crate) fn block_coords<const D: usize>(mut index: usize, bc: [usize; D]) -> [usize; D] {
    let mut b = [0usize; D];
    for axis in 0..D {
        b[axis] = index % bc[axis];
        index /= bc[axis];
    }
    b
}

/// Geometry of one block within a field: source offset of its origin and
/// valid edge lengths.
pub(crate) struct BlockSite<const D: usize> {
    pub origin: isize,
    pub edges: [usize; D],
    pub partial: bool,
}

pub(crate) fn block_site<const D: usize>(
    b: [usize; D],
    dims: [usize; D],
    strides: [isize; D],
) -> BlockSite<D> {
    let mut origin = 0isize;
    let mut edges = [0usize; D];
    let mut partial = false;
    for axis in 0..D {
        origin += (4 * b[axis]) as isize * strides[axis];
        let e = (dims[axis] - 4 * b[axis]).min(4);
        edges[axis] = e;
        partial |= e < 4;
    }
    BlockSite {
        origin,
        edges,
        partial,
    }
}

#[inline]
fn take<const D: usize>(a: [usize; 4]) -> [usize; D] {
    core::array::from_fn(|i| a[i])
}

#[inline]
fn take_isize<const D: usize>(a: [isize; 4]) -> [isize; D] {
    core::array::from_fn(|i| a[i])
}

// ─────────────────────────────────────────────────────────────────────────────
// Gather / scatter
// ─────────────────────────────────────────────────────────────────────────────

/// Fill a full 4^d block from `base` using strides.
///
/// # Safety
/// Every element at `base + Σ cᵢ·strideᵢ` for cᵢ ∈ 0..4 must be readable.
pub(crate) unsafe fn gather_full<T: Scalar, const D: usize>(
    block: &mut [T],
    base: *const T,
    strides: &[isize; D],
) {
    for (u, slot) in block.iter_mut().enumerate() {
        let mut off = 0isize;
        for (axis, &s) in strides.iter().enumerate() {
            off += (((u >> (2 * axis)) & 3) as isize) * s;
        }
        *slot = *base.offset(off);
    }
}

/// Fill a partial block (edge lengths `e`) and extend it to a full block
/// by the padding cascade: lines along x for every valid (y,z,w), then
/// along y over all x, and so on up the axes.
///
/// # Safety
/// Every element at `base + Σ cᵢ·strideᵢ` for cᵢ ∈ 0..eᵢ must be readable.
pub(crate) unsafe fn gather_partial<T: Scalar, const D: usize>(
    block: &mut [T],
    base: *const T,
    strides: &[isize; D],
    e: &[usize; D],
) {
    let n = block.len();
    // Copy the valid region.
    for u in 0..n {
        let mut off = 0isize;
        let mut valid = true;
        for (axis, &s) in strides.iter().enumerate() {
            let c = (u >> (2 * axis)) & 3;
            if c >= e[axis] {
                valid = false;
                break;
            }
            off += c as isize * s;
        }
        if valid {
            block[u] = *base.offset(off);
        }
    }
    // Pad one axis at a time; lower axes are already full lines, higher
    // axes still index only valid coordinates.
    for axis in 0..D {
        let s = 1usize << (2 * axis);
        for u in 0..n {
            if (u >> (2 * axis)) & 3 != 0 {
                continue;
            }
            let mut at_valid_line = true;
            for upper in (axis + 1)..D {
                if ((u >> (2 * upper)) & 3) >= e[upper] {
                    at_valid_line = false;
                    break;
                }
            }
            if at_valid_line {
                pad_line(block, u, s, e[axis]);
            }
        }
    }
}

/// Write a full block back through strides.
///
/// # Safety
/// Every element at `base + Σ cᵢ·strideᵢ` for cᵢ ∈ 0..4 must be writable.
pub(crate) unsafe fn scatter_full<T: Scalar, const D: usize>(
    block: &[T],
    base: *mut T,
    strides: &[isize; D],
) {
    for (u, &v) in block.iter().enumerate() {
        let mut off = 0isize;
        for (axis, &s) in strides.iter().enumerate() {
            off += (((u >> (2 * axis)) & 3) as isize) * s;
        }
        *base.offset(off) = v;
    }
}

/// Write only the valid region of a partial block back through strides.
///
/// # Safety
/// Every element at `base + Σ cᵢ·strideᵢ` for cᵢ ∈ 0..eᵢ must be writable.
pub(crate) unsafe fn scatter_partial<T: Scalar, const D: usize>(
    block: &[T],
    base: *mut T,
    strides: &[isize; D],
    e: &[usize; D],
) {
    for (u, &v) in block.iter().enumerate() {
        let mut off = 0isize;
        let mut valid = true;
        for (axis, &s) in strides.iter().enumerate() {
            let c = (u >> (2 * axis)) & 3;
            if c >= e[axis] {
                valid = false;
                break;
            }
            off += c as isize * s;
        }
        if valid {
            *base.offset(off) = v;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serial drivers
// ─────────────────────────────────────────────────────────────────────────────

/// Compress every block of `field` into `bs`.  Returns total bits written
/// (including fixed-rate alignment padding).
pub(crate) fn compress_serial<T: Scalar, const D: usize>(
    codec: &Codec,
    field: &Field<'_, T>,
    bs: &mut BitStream<'_>,
) -> usize {
    let dims: [usize; D] = take(field.dims());
    let strides: [isize; D] = take_isize(field.strides());
    let bc: [usize; D] = take(field.block_counts());
    let n = block_size(D);
    let fixed = codec.mode() == Mode::FixedRate;
    let base = field.as_ptr();

    let mut block = [T::default(); MAX_BLOCK_SIZE];
    let mut total_bits = 0usize;
    for_each_block(bc, |b| {
        let site = block_site(b, dims, strides);
        // SAFETY: the block site stays inside the field per the Field
        // construction contract.
        unsafe {
            let p = base.offset(site.origin);
            if site.partial {
                gather_partial::<T, D>(&mut block[..n], p, &strides, &site.edges);
            } else {
                gather_full::<T, D>(&mut block[..n], p, &strides);
            }
        }
        total_bits += encode_block(codec, bs, &block[..n]) as usize;
        if fixed {
            // Word-align the block boundary for O(1) block addressing; a
            // no-op when the rate is already word-aligned.
            total_bits += bs.flush();
        }
    });
    total_bits
}

/// Decompress every block of `bs` into `field`.  Returns total bits
/// consumed.
pub(crate) fn decompress_serial<T: Scalar, R: BitRead, const D: usize>(
    codec: &Codec,
    field: &mut Field<'_, T>,
    bs: &mut R,
) -> usize {
    let dims: [usize; D] = take(field.dims());
    let strides: [isize; D] = take_isize(field.strides());
    let bc: [usize; D] = take(field.block_counts());
    let n = block_size(D);
    let fixed = codec.mode() == Mode::FixedRate;
    let base = field.as_mut_ptr();

    let mut block = [T::default(); MAX_BLOCK_SIZE];
    let mut total_bits = 0usize;
    for_each_block(bc, |b| {
        let site = block_site(b, dims, strides);
        total_bits += decode_block(codec, bs, &mut block[..n]) as usize;
        if fixed {
            bs.align_read();
        }
        // SAFETY: the block site stays inside the field per the Field
        // construction contract.
        unsafe {
            let p = base.offset(site.origin);
            if site.partial {
                scatter_partial::<T, D>(&block[..n], p, &strides, &site.edges);
            } else {
                scatter_full::<T, D>(&block[..n], p, &strides);
            }
        }
    });
    total_bits
}
