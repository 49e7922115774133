//! High-level compression drivers: block traversal over a field, capacity
//! checking, and execution-policy dispatch.

pub mod offload;
pub(crate) mod parallel;
pub(crate) mod serial;

use tracing::debug;

use crate::bitstream::{word_align_bits, BitRead, BitReader, BitStream};
use crate::block::types::{block_size, Scalar, GROUP_SIZE};
use crate::codec::{Codec, CodecError, Execution, Mode};
use crate::field::Field;

use offload::{OffloadBackend, ReferenceOffload};

// ─────────────────────────────────────────────────────────────────────────────
// Size bound
// ─────────────────────────────────────────────────────────────────────────────

/// Conservative upper bound, in bytes, on the compressed size of `field`
/// under `codec`.  Compression refuses to start into a smaller buffer.
pub fn maximum_size<T: Scalar>(codec: &Codec, field: &Field<'_, T>) -> usize {
    let d = field.dimensionality();
    let n = block_size(d) as u32;
    let groups = n / GROUP_SIZE as u32;
    // Data bit, reversible marker, exponent; then every plane's group and
    // coefficient bits.
    let header = 2 + T::EBITS;
    let planes = codec.maxprec().min(<T::Int as crate::block::types::Coeff>::BITS);
    let worst = codec
        .maxbits()
        .min(header + planes * (n + groups))
        .max(codec.minbits());
    let per_block = word_align_bits(worst as usize);
    (per_block * field.block_count()).div_ceil(8)
}

fn check_capacity<T: Scalar>(
    codec: &Codec,
    field: &Field<'_, T>,
    available: usize,
) -> Result<(), CodecError> {
    let needed = maximum_size(codec, field);
    if available < needed {
        return Err(CodecError::Capacity { needed, available });
    }
    Ok(())
}

fn check_config<T: Scalar>(codec: &Codec, field: &Field<'_, T>) -> Result<usize, CodecError> {
    let d = field.dimensionality();
    if d == 0 || d > 4 {
        return Err(CodecError::InvalidConfig);
    }
    // Accuracy budgeting has no meaning for implicit-exponent types.
    if codec.mode() == Mode::FixedAccuracy && !T::IS_FLOAT {
        return Err(CodecError::InvalidConfig);
    }
    Ok(d)
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression
// ─────────────────────────────────────────────────────────────────────────────

fn compress_serial_dispatch<T: Scalar>(
    codec: &Codec,
    field: &Field<'_, T>,
    d: usize,
    dst: &mut [u8],
) -> usize {
    let mut bs = BitStream::new(dst);
    match d {
        1 => serial::compress_serial::<T, 1>(codec, field, &mut bs),
        2 => serial::compress_serial::<T, 2>(codec, field, &mut bs),
        3 => serial::compress_serial::<T, 3>(codec, field, &mut bs),
        _ => serial::compress_serial::<T, 4>(codec, field, &mut bs),
    };
    bs.flush();
    bs.tell_w() / 8
}

fn compress_parallel_dispatch<T: Scalar>(
    codec: &Codec,
    field: &Field<'_, T>,
    d: usize,
    dst: &mut [u8],
    threads: usize,
) -> usize {
    match d {
        1 => parallel::compress_parallel::<T, 1>(codec, field, dst, threads),
        2 => parallel::compress_parallel::<T, 2>(codec, field, dst, threads),
        3 => parallel::compress_parallel::<T, 3>(codec, field, dst, threads),
        _ => parallel::compress_parallel::<T, 4>(codec, field, dst, threads),
    }
}

fn offload_dispatch<T: Scalar, B: OffloadBackend>(
    backend: &B,
    codec: &Codec,
    field: &Field<'_, T>,
    d: usize,
    dst: &mut [u8],
) -> usize {
    match d {
        1 => backend.compress::<T, 1>(codec, field, dst),
        2 => backend.compress::<T, 2>(codec, field, dst),
        3 => backend.compress::<T, 3>(codec, field, dst),
        _ => backend.compress::<T, 4>(codec, field, dst),
    }
}

/// Compress `field` into `dst` under `codec`.  Returns the number of
/// bytes written (always a whole number of stream words).
///
/// `dst` must be at least [`maximum_size`] bytes; otherwise nothing is
/// written and `Capacity` is reported.
pub fn compress<T: Scalar>(
    codec: &Codec,
    field: &Field<'_, T>,
    dst: &mut [u8],
) -> Result<usize, CodecError> {
    let d = check_config(codec, field)?;
    check_capacity(codec, field, dst.len())?;
    debug!(
        dims = ?field.dims(),
        mode = ?codec.mode(),
        exec = ?codec.execution(),
        blocks = field.block_count(),
        "compress"
    );

    let bytes = match codec.execution() {
        Execution::Serial => compress_serial_dispatch(codec, field, d, dst),
        Execution::Parallel { threads } => {
            // Non-fixed-rate block offsets are data-dependent; those modes
            // are strictly sequential.
            if codec.is_block_addressable() {
                let n = compress_parallel_dispatch(codec, field, d, dst, threads);
                if n > 0 {
                    n
                } else {
                    compress_serial_dispatch(codec, field, d, dst)
                }
            } else {
                compress_serial_dispatch(codec, field, d, dst)
            }
        }
        Execution::Offload => {
            let backend = ReferenceOffload;
            let n = offload_dispatch(&backend, codec, field, d, dst);
            if n > 0 {
                n
            } else {
                // Backend declined the configuration; fall back to serial.
                debug!(backend = backend.name(), "offload declined, serial fallback");
                compress_serial_dispatch(codec, field, d, dst)
            }
        }
    };
    Ok(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompression
// ─────────────────────────────────────────────────────────────────────────────

/// Decompress `src` into `field` under `codec`.  Returns the number of
/// compressed bytes consumed.  A truncated `src` decodes missing bits as
/// zero coefficients.
pub fn decompress<T: Scalar>(
    codec: &Codec,
    field: &mut Field<'_, T>,
    src: &[u8],
) -> Result<usize, CodecError> {
    let d = check_config(codec, field)?;
    debug!(
        dims = ?field.dims(),
        mode = ?codec.mode(),
        blocks = field.block_count(),
        "decompress"
    );
    let mut bs = BitReader::new(src);
    match d {
        1 => serial::decompress_serial::<T, _, 1>(codec, field, &mut bs),
        2 => serial::decompress_serial::<T, _, 2>(codec, field, &mut bs),
        3 => serial::decompress_serial::<T, _, 3>(codec, field, &mut bs),
        _ => serial::decompress_serial::<T, _, 4>(codec, field, &mut bs),
    };
    Ok(bs.tell_r().div_ceil(8))
}
