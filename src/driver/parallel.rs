//! Parallel fixed-rate compression.
//!
//! Fixed-rate blocks occupy disjoint, word-aligned byte ranges at offsets
//! known up front, so each worker owns a private bit-stream cursor over
//! its block's range and no synchronization is needed beyond the join at
//! the end of the block loop.  The output is bit-identical to the serial
//! path: each block's bits are identical and the concatenation order is
//! the same row-major block order.
//!
//! Non-fixed-rate modes have data-dependent block offsets and are
//! strictly sequential; callers fall back to the serial driver for them.

use rayon::prelude::*;
use tracing::debug;

use crate::bitstream::BitStream;
use crate::block::encode::encode_block;
use crate::block::types::{block_size, Scalar, MAX_BLOCK_SIZE};
use crate::codec::Codec;
use crate::field::Field;

use super::serial::{block_coords, block_site, gather_full, gather_partial};

/// Shares a read-only field across workers.
///
/// SAFETY: compression only reads through the base pointer, and the Field
/// construction contract guarantees the pointed-at region outlives the
/// borrow; distinct workers write to disjoint output chunks handed out by
/// `par_chunks_mut`.
struct SyncFieldPtr<T>(*const T);
unsafe impl<T> Send for SyncFieldPtr<T> {}
unsafe impl<T> Sync for SyncFieldPtr<T> {}

/// Compress `field` at a word-aligned fixed rate into `dst`, one chunk
/// per block.  Returns the number of bytes written.
///
/// Preconditions (checked by the dispatching driver): fixed-rate mode
/// with a word-aligned block budget, and `dst` at least
/// `block_count · maxbits / 8` bytes.
pub(crate) fn compress_parallel<T: Scalar, const D: usize>(
    codec: &Codec,
    field: &Field<'_, T>,
    dst: &mut [u8],
    threads: usize,
) -> usize {
    debug_assert!(codec.is_block_addressable());
    let bytes_per_block = codec.maxbits() as usize / 8;
    let nblocks = field.block_count();
    let total = nblocks * bytes_per_block;

    let dims: [usize; D] = core::array::from_fn(|i| field.dims()[i]);
    let strides: [isize; D] = core::array::from_fn(|i| field.strides()[i]);
    let bc: [usize; D] = core::array::from_fn(|i| field.block_counts()[i]);
    let n = block_size(D);
    let base = SyncFieldPtr(field.as_ptr());

    let workers = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(_) => {
            // Pool construction failing (resource exhaustion) degrades to
            // the caller's serial fallback.
            return 0;
        }
    };
    debug!(nblocks, workers, bytes_per_block, "parallel fixed-rate compress");

    let base = &base;
    pool.install(|| {
        dst[..total]
            .par_chunks_mut(bytes_per_block)
            .enumerate()
            .for_each(|(index, chunk)| {
                let b = block_coords(index, bc);
                let site = block_site(b, dims, strides);
                let mut block = [T::default(); MAX_BLOCK_SIZE];
                // SAFETY: read-only gather inside the field region; see
                // SyncFieldPtr.
                unsafe {
                    let p = base.0.offset(site.origin);
                    if site.partial {
                        gather_partial::<T, D>(&mut block[..n], p, &strides, &site.edges);
                    } else {
                        gather_full::<T, D>(&mut block[..n], p, &strides);
                    }
                }
                let mut bs = BitStream::new(chunk);
                encode_block(codec, &mut bs, &block[..n]);
                bs.flush();
            });
    });
    total
}
