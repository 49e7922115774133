//! The per-block compression engine.
//!
//! A block is a 4^d tile of scalars, the unit of independent compression;
//! no state crosses block boundaries, which is what makes block-granular
//! random access possible.

pub mod decode;
pub mod encode;
pub mod types;

// Re-export the most important items at the module level.
pub use decode::decode_block;
pub use encode::encode_block;
pub use types::{block_size, Coeff, Scalar, ScalarType, BLOCK_EDGE, MAX_BLOCK_SIZE, MAX_DIMS};
