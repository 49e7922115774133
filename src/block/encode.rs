//! Forward block pipeline: block-floating-point mapping, decorrelating
//! transform, reordering, negabinary mapping, and the embedded bit-plane
//! encoder.
//!
//! Per-block bit layout, in write order:
//!   1. one "block has data" bit (0 → all-zero block, stop);
//!   2. floats only: the biased block exponent (8 / 11 bits) — in
//!      reversible mode preceded by a one-bit marker selecting the
//!      lossless-scaling or bit-reinterpretation path;
//!   3. the embedded code, most significant plane first: per plane, one
//!      significance bit per group of four coefficients, then one
//!      refinement bit per previously-significant coefficient, then one
//!      candidate bit per still-insignificant coefficient inside each
//!      flagged group;
//!   4. zero padding up to `minbits`.
//!
//! Encoding a block never closes the stream word; fixed-rate alignment is
//! the driver's job.

use crate::bitstream::BitStream;
use crate::codec::Codec;

use super::types::{
    block_size, fwd_order, fwd_xform, rev_fwd_xform, Coeff, Scalar, GROUP_SIZE, MAX_BLOCK_SIZE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Largest exponent over the block's samples; −EBIAS for an all-zero block.
pub(crate) fn block_exponent<T: Scalar>(block: &[T]) -> i32 {
    let mut max = T::default();
    for &x in block {
        let a = x.abs();
        if a > max {
            max = a;
        }
    }
    max.exponent()
}

/// Bit planes kept for a block with exponent `emax`.
///
/// `maxprec` caps the count; `minexp` cuts planes whose absolute magnitude
/// falls below the accuracy floor, with 2(d+1) slack planes absorbing the
/// transform gain.  A result of zero suppresses the block entirely.
pub(crate) fn block_precision<T: Scalar>(emax: i32, codec: &Codec, dims: usize) -> u32 {
    if T::IS_FLOAT {
        let planes = emax - codec.minexp + 2 * (dims as i32 + 1);
        codec.maxprec.min(planes.max(0) as u32)
    } else {
        codec.maxprec.min(T::Int::BITS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedded bit-plane encoder
// ─────────────────────────────────────────────────────────────────────────────

/// Encode `prec` bit planes of the negabinary coefficients in `ublock`
/// (already in traversal order), spending at most `maxbits` bits.
/// Returns the number of bits written.
pub(crate) fn encode_embedded(
    bs: &mut BitStream,
    maxbits: u32,
    prec: u32,
    intprec: u32,
    ublock: &[u64],
) -> u32 {
    let n = ublock.len();
    let ngroups = n / GROUP_SIZE;
    let kmin = intprec.saturating_sub(prec);
    let mut bits = 0u32;
    let mut sig = [false; MAX_BLOCK_SIZE];
    let mut flags = [false; MAX_BLOCK_SIZE / GROUP_SIZE];

    'planes: for k in (kmin..intprec).rev() {
        // Group significance: does any still-insignificant member first
        // raise its bit at this plane?
        for (g, flag) in flags.iter_mut().enumerate().take(ngroups) {
            let mut f = false;
            for i in g * GROUP_SIZE..(g + 1) * GROUP_SIZE {
                if !sig[i] && (ublock[i] >> k) & 1 != 0 {
                    f = true;
                }
            }
            *flag = f;
            if bits == maxbits {
                break 'planes;
            }
            bs.write_bit(f);
            bits += 1;
        }
        // Refinement bits for coefficients significant since an earlier
        // plane.
        for (i, &u) in ublock.iter().enumerate() {
            if sig[i] {
                if bits == maxbits {
                    break 'planes;
                }
                bs.write_bit((u >> k) & 1 != 0);
                bits += 1;
            }
        }
        // Candidate bits inside flagged groups; a 1 promotes the
        // coefficient, which then refines from the next plane on.
        for (i, &u) in ublock.iter().enumerate() {
            if !sig[i] && flags[i / GROUP_SIZE] {
                if bits == maxbits {
                    break 'planes;
                }
                let b = (u >> k) & 1 != 0;
                bs.write_bit(b);
                bits += 1;
                if b {
                    sig[i] = true;
                }
            }
        }
    }
    bits
}

// ─────────────────────────────────────────────────────────────────────────────
// Block encoders
// ─────────────────────────────────────────────────────────────────────────────

fn pad_to_minbits(bs: &mut BitStream, codec: &Codec, bits: u32) -> u32 {
    if bits < codec.minbits {
        bs.pad((codec.minbits - bits) as usize);
        codec.minbits
    } else {
        bits
    }
}

fn encode_coefficients<I: Coeff>(
    bs: &mut BitStream,
    codec: &Codec,
    header_bits: u32,
    prec: u32,
    iblock: &[I],
    dims: usize,
) -> u32 {
    let n = block_size(dims);
    let mut ublock = [0u64; MAX_BLOCK_SIZE];
    fwd_order(&mut ublock[..n], iblock, dims);
    let budget = codec.maxbits.saturating_sub(header_bits);
    header_bits + encode_embedded(bs, budget, prec, I::BITS, &ublock[..n])
}

fn encode_float_block<T: Scalar>(codec: &Codec, bs: &mut BitStream, block: &[T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    let emax = block_exponent(block);
    let prec = block_precision::<T>(emax, codec, dims);
    // Zero blocks and blocks suppressed by the accuracy floor share the
    // biased exponent 0.
    let e = if prec > 0 { emax + T::EBIAS } else { 0 };
    if e > 0 {
        // The low bit of 2e+1 is the "has data" marker.
        bs.write_bits((2 * e as u64) | 1, (T::EBITS + 1) as usize);
        let bits = 1 + T::EBITS;
        let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
        for (i, &x) in block.iter().enumerate() {
            iblock[i] = x.scale_to_int(emax);
        }
        fwd_xform(&mut iblock[..n], dims);
        let bits = encode_coefficients(bs, codec, bits, prec, &iblock[..n], dims);
        pad_to_minbits(bs, codec, bits)
    } else {
        bs.write_bit(false);
        pad_to_minbits(bs, codec, 1)
    }
}

fn encode_int_block<T: Scalar>(codec: &Codec, bs: &mut BitStream, block: &[T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    if block.iter().all(|&x| x.bits_eq(T::default())) {
        bs.write_bit(false);
        return pad_to_minbits(bs, codec, 1);
    }
    bs.write_bit(true);
    let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
    for (i, &x) in block.iter().enumerate() {
        iblock[i] = x.scale_to_int(0);
    }
    fwd_xform(&mut iblock[..n], dims);
    let prec = block_precision::<T>(0, codec, dims);
    let bits = encode_coefficients(bs, codec, 1, prec, &iblock[..n], dims);
    pad_to_minbits(bs, codec, bits)
}

/// Reversible pipeline.  Integers go straight through the exactly
/// invertible transform.  Floats first try the block-floating-point
/// scaling and verify it round-trips bit for bit; when any sample fails,
/// the block falls back to reinterpreting the IEEE encodings as ordered
/// integers, which is always exact.
fn encode_reversible_block<T: Scalar>(codec: &Codec, bs: &mut BitStream, block: &[T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    if block.iter().all(|&x| x.bits_eq(T::default())) {
        bs.write_bit(false);
        return pad_to_minbits(bs, codec, 1);
    }
    bs.write_bit(true);
    let mut bits = 1u32;

    let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
    if T::IS_FLOAT {
        let emax = block_exponent(block);
        let mut lossless = true;
        for (i, &x) in block.iter().enumerate() {
            let v = x.scale_to_int(emax);
            if !T::scale_from_int(v, emax).bits_eq(x) {
                lossless = false;
                break;
            }
            iblock[i] = v;
        }
        bs.write_bit(lossless);
        bits += 1;
        if lossless {
            bs.write_bits((emax + T::EBIAS) as u64, T::EBITS as usize);
            bits += T::EBITS;
        } else {
            for (i, &x) in block.iter().enumerate() {
                iblock[i] = x.to_ordered_int();
            }
        }
    } else {
        for (i, &x) in block.iter().enumerate() {
            iblock[i] = x.scale_to_int(0);
        }
    }

    rev_fwd_xform(&mut iblock[..n], dims);
    let bits = encode_coefficients(bs, codec, bits, T::Int::BITS, &iblock[..n], dims);
    pad_to_minbits(bs, codec, bits)
}

/// Dimensionality of a block from its length (4^d scalars).
#[inline]
pub(crate) fn dims_of(len: usize) -> usize {
    debug_assert!(len.is_power_of_two() && len.trailing_zeros() % 2 == 0);
    (len.trailing_zeros() / 2) as usize
}

/// Encode one full 4^d block of scalars.  Returns the number of bits
/// written (minbits-padded; the stream word is left open).
pub fn encode_block<T: Scalar>(codec: &Codec, bs: &mut BitStream, block: &[T]) -> u32 {
    if codec.reversible {
        encode_reversible_block(codec, bs, block)
    } else if T::IS_FLOAT {
        encode_float_block(codec, bs, block)
    } else {
        encode_int_block(codec, bs, block)
    }
}
