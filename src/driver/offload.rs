//! Offload backend seam.
//!
//! An offload backend is an opaque accelerator that accepts a (codec,
//! field, destination) triple.  The contract:
//!   - in word-aligned fixed-rate mode it MUST produce output
//!     bit-identical to the serial path;
//!   - in any other mode it MUST return 0 and leave the destination
//!     untouched (block offsets are data-dependent there, so the backend
//!     cannot partition the work).
//!
//! The driver probes the backend at call time and falls back to the
//! serial path when the backend declines the configuration.

use crate::block::types::Scalar;
use crate::codec::Codec;
use crate::field::Field;

use super::parallel::compress_parallel;

/// An accelerator that can stand in for the serial block loop.
pub trait OffloadBackend {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the backend can handle this configuration at all.
    fn supports(&self, codec: &Codec) -> bool;

    /// Compress `field` into `dst`.  Returns bytes written, or 0 —
    /// with `dst` untouched — when the configuration is unsupported.
    fn compress<T: Scalar, const D: usize>(
        &self,
        codec: &Codec,
        field: &Field<'_, T>,
        dst: &mut [u8],
    ) -> usize;
}

/// Reference backend: drives the thread-pool path, which is bit-identical
/// to serial by construction.  Stands in for device backends in tests and
/// on hosts without an accelerator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceOffload;

impl OffloadBackend for ReferenceOffload {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn supports(&self, codec: &Codec) -> bool {
        codec.is_block_addressable()
    }

    fn compress<T: Scalar, const D: usize>(
        &self,
        codec: &Codec,
        field: &Field<'_, T>,
        dst: &mut [u8],
    ) -> usize {
        if !self.supports(codec) {
            return 0;
        }
        compress_parallel::<T, D>(codec, field, dst, 0)
    }
}
