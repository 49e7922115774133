//! Inverse block pipeline: embedded bit-plane decoder, inverse reorder,
//! inverse transform, and the integer→scalar mapping.
//!
//! The decoder walks the exact bit sequence the encoder produced — same
//! plane order, same group/refinement/candidate protocol, same `maxbits`
//! budget arithmetic — so both sides stop at the same bit position even
//! when the budget expires mid-plane.  Bits absent from a truncated
//! stream read as zero, which decodes to zero coefficients.

use crate::bitstream::BitRead;
use crate::codec::Codec;

use super::encode::{block_precision, dims_of};
use super::types::{
    block_size, inv_order, inv_xform, rev_inv_xform, Coeff, Scalar, GROUP_SIZE, MAX_BLOCK_SIZE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Embedded bit-plane decoder
// ─────────────────────────────────────────────────────────────────────────────

/// Decode up to `prec` bit planes into `ublock` (traversal order),
/// consuming at most `maxbits` bits.  Returns the number of bits read.
pub(crate) fn decode_embedded<R: BitRead>(
    bs: &mut R,
    maxbits: u32,
    prec: u32,
    intprec: u32,
    ublock: &mut [u64],
) -> u32 {
    let n = ublock.len();
    let ngroups = n / GROUP_SIZE;
    let kmin = intprec.saturating_sub(prec);
    let mut bits = 0u32;
    let mut sig = [false; MAX_BLOCK_SIZE];
    let mut flags = [false; MAX_BLOCK_SIZE / GROUP_SIZE];

    for u in ublock.iter_mut() {
        *u = 0;
    }

    'planes: for k in (kmin..intprec).rev() {
        for flag in flags.iter_mut().take(ngroups) {
            if bits == maxbits {
                break 'planes;
            }
            *flag = bs.read_bit();
            bits += 1;
        }
        for (i, u) in ublock.iter_mut().enumerate() {
            if sig[i] {
                if bits == maxbits {
                    break 'planes;
                }
                if bs.read_bit() {
                    *u |= 1u64 << k;
                }
                bits += 1;
            }
        }
        for (i, u) in ublock.iter_mut().enumerate() {
            if !sig[i] && flags[i / GROUP_SIZE] {
                if bits == maxbits {
                    break 'planes;
                }
                if bs.read_bit() {
                    *u |= 1u64 << k;
                    sig[i] = true;
                }
                bits += 1;
            }
        }
    }
    bits
}

// ─────────────────────────────────────────────────────────────────────────────
// Block decoders
// ─────────────────────────────────────────────────────────────────────────────

fn skip_to_minbits<R: BitRead>(bs: &mut R, codec: &Codec, bits: u32) -> u32 {
    if bits < codec.minbits {
        bs.skip((codec.minbits - bits) as usize);
        codec.minbits
    } else {
        bits
    }
}

fn decode_coefficients<I: Coeff, R: BitRead>(
    bs: &mut R,
    codec: &Codec,
    header_bits: u32,
    prec: u32,
    iblock: &mut [I],
    dims: usize,
) -> u32 {
    let n = block_size(dims);
    let mut ublock = [0u64; MAX_BLOCK_SIZE];
    let budget = codec.maxbits.saturating_sub(header_bits);
    let used = decode_embedded(bs, budget, prec, I::BITS, &mut ublock[..n]);
    inv_order(iblock, &ublock[..n], dims);
    header_bits + used
}

fn decode_float_block<T: Scalar, R: BitRead>(codec: &Codec, bs: &mut R, block: &mut [T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    if !bs.read_bit() {
        block.fill(T::default());
        return skip_to_minbits(bs, codec, 1);
    }
    let e = bs.read_bits(T::EBITS as usize) as i32;
    let emax = e - T::EBIAS;
    let bits = 1 + T::EBITS;
    let prec = block_precision::<T>(emax, codec, dims);
    let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
    let bits = decode_coefficients(bs, codec, bits, prec, &mut iblock[..n], dims);
    inv_xform(&mut iblock[..n], dims);
    for (x, &i) in block.iter_mut().zip(iblock.iter()) {
        *x = T::scale_from_int(i, emax);
    }
    skip_to_minbits(bs, codec, bits)
}

fn decode_int_block<T: Scalar, R: BitRead>(codec: &Codec, bs: &mut R, block: &mut [T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    if !bs.read_bit() {
        block.fill(T::default());
        return skip_to_minbits(bs, codec, 1);
    }
    let prec = block_precision::<T>(0, codec, dims);
    let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
    let bits = decode_coefficients(bs, codec, 1, prec, &mut iblock[..n], dims);
    inv_xform(&mut iblock[..n], dims);
    for (x, &i) in block.iter_mut().zip(iblock.iter()) {
        *x = T::scale_from_int(i, 0);
    }
    skip_to_minbits(bs, codec, bits)
}

fn decode_reversible_block<T: Scalar, R: BitRead>(codec: &Codec, bs: &mut R, block: &mut [T]) -> u32 {
    let dims = dims_of(block.len());
    let n = block.len();
    if !bs.read_bit() {
        block.fill(T::default());
        return skip_to_minbits(bs, codec, 1);
    }
    let mut bits = 1u32;

    let mut lossless = false;
    let mut emax = 0i32;
    if T::IS_FLOAT {
        lossless = bs.read_bit();
        bits += 1;
        if lossless {
            emax = bs.read_bits(T::EBITS as usize) as i32 - T::EBIAS;
            bits += T::EBITS;
        }
    }

    let mut iblock = [T::Int::default(); MAX_BLOCK_SIZE];
    let bits = decode_coefficients(bs, codec, bits, T::Int::BITS, &mut iblock[..n], dims);
    rev_inv_xform(&mut iblock[..n], dims);

    if T::IS_FLOAT && !lossless {
        for (x, &i) in block.iter_mut().zip(iblock.iter()) {
            *x = T::from_ordered_int(i);
        }
    } else {
        for (x, &i) in block.iter_mut().zip(iblock.iter()) {
            *x = T::scale_from_int(i, emax);
        }
    }
    skip_to_minbits(bs, codec, bits)
}

/// Decode one full 4^d block of scalars.  Returns the number of bits
/// consumed, including any skipped minbits padding.
pub fn decode_block<T: Scalar, R: BitRead>(codec: &Codec, bs: &mut R, block: &mut [T]) -> u32 {
    if codec.reversible {
        decode_reversible_block(codec, bs, block)
    } else if T::IS_FLOAT {
        decode_float_block(codec, bs, block)
    } else {
        decode_int_block(codec, bs, block)
    }
}
