// tessera — lossy compressed scalar arrays with block-local random access

pub mod array;
pub mod bitstream;
pub mod block;
pub mod checksum;
pub mod codec;
pub mod driver;
pub mod field;
pub mod header;
pub mod testdata;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level convenience re-exports for the most common API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// One-shot field compression into a caller-sized buffer.
pub use driver::compress;
/// One-shot field decompression.
pub use driver::decompress;
/// Conservative upper bound on compressed size; size buffers with this.
pub use driver::maximum_size;

/// Codec parameter block and mode policy.
pub use codec::{Codec, CodecError, Execution, Mode};

/// Uncompressed-array description (type, dims, strides, pointer).
pub use field::Field;

/// Element types.
pub use block::types::{Scalar, ScalarType};

/// Fixed-rate compressed array with cached mutable element access.
pub use array::{ArrayError, BlockIter, CompressedArray, ElemPtr, ElemRef};

/// Optional stream header.
pub use header::{read_header, write_header, Header, HeaderError};

// ─────────────────────────────────────────────────────────────────────────────
// Version API
// ─────────────────────────────────────────────────────────────────────────────

pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 9;
pub const VERSION_RELEASE: u32 = 0;
pub const VERSION_NUMBER: u32 = VERSION_MAJOR * 100 * 100 + VERSION_MINOR * 100 + VERSION_RELEASE;
pub const VERSION_STRING: &str = "0.9.0";

/// Returns the library version number (e.g. 900 for v0.9.0).
pub fn version_number() -> u32 {
    VERSION_NUMBER
}

/// Returns the library version string.
pub fn version_string() -> &'static str {
    VERSION_STRING
}
