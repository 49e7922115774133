//! Thin wrapper around the `xxhash-rust` crate providing the digests the
//! conformance suite uses to compare streams and decoded arrays.
//!
//! The scalar digest hashes the little-endian byte rendering of each
//! element, so the value is identical across hosts of either endianness
//! (and distinguishes −0.0 from +0.0, which matters for bit-exact
//! reversible-mode comparisons).

pub use xxhash_rust::xxh32::Xxh32 as Xxh32State;
pub use xxhash_rust::xxh64::Xxh64 as Xxh64State;

use crate::block::types::Scalar;

/// One-shot 32-bit digest of a byte slice.
#[inline]
pub fn xxh32_oneshot(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// One-shot 64-bit digest of a byte slice.
#[inline]
pub fn xxh64_oneshot(data: &[u8], seed: u64) -> u64 {
    xxhash_rust::xxh64::xxh64(data, seed)
}

/// Digest of a compressed stream.
pub fn stream_checksum(stream: &[u8]) -> u64 {
    xxh64_oneshot(stream, 0)
}

/// Host-independent digest of a scalar slice.
pub fn scalar_checksum<T: Scalar>(data: &[T]) -> u64 {
    let mut bytes = Vec::with_capacity(data.len() * T::TYPE.size());
    for &x in data {
        x.append_le_bytes(&mut bytes);
    }
    xxh64_oneshot(&bytes, 0)
}
