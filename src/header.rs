//! Optional stream header: a tagged prefix carrying everything needed to
//! decode a headerless stream — scalar type, dimensions, and the codec
//! knobs.
//!
//! The core compress/decompress entry points neither read nor write this;
//! callers that round-trip parameters out of band never pay for it.  The
//! header is written through the bit stream and word-aligned so the
//! payload that follows starts on a word boundary.

use core::fmt;

use crate::bitstream::{BitRead, BitStream};
use crate::block::types::ScalarType;
use crate::codec::{Codec, Execution, MAX_BITS, MAX_PREC, MIN_EXP};

/// Four-byte stream magic, `"tsra"`.
pub const MAGIC: u32 = u32::from_le_bytes(*b"tsra");

/// Header format version.
pub const VERSION: u32 = 1;

const SIZE_BITS: usize = 48;
const MINEXP_BIAS: i32 = 1 << 14;

/// Errors reported when parsing a stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The stream does not start with the magic tag.
    BadMagic,
    /// The format version is newer than this library understands.
    BadVersion,
    /// A field holds a value outside its domain.
    BadField,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::BadMagic => f.write_str("missing stream magic"),
            HeaderError::BadVersion => f.write_str("unsupported header version"),
            HeaderError::BadField => f.write_str("malformed header field"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Everything a header round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub scalar_type: ScalarType,
    /// Per-axis sizes; absent axes are 0.
    pub dims: [usize; 4],
    pub codec: Codec,
}

/// Write `header` at the current write position and word-align.
/// Returns the number of bits written including alignment.
pub fn write_header(bs: &mut BitStream<'_>, header: &Header) -> usize {
    let start = bs.tell_w();
    bs.write_bits(MAGIC as u64, 32);
    bs.write_bits(VERSION as u64, 16);
    bs.write_bits(header.scalar_type as u64, 4);
    let d = header.dims.iter().take_while(|&&n| n > 0).count();
    bs.write_bits(d as u64, 3);
    for &n in header.dims.iter().take(d) {
        bs.write_bits(n as u64, SIZE_BITS);
    }
    let codec = &header.codec;
    bs.write_bits(codec.minbits() as u64, 16);
    bs.write_bits(codec.maxbits() as u64, 16);
    bs.write_bits(codec.maxprec() as u64, 7);
    bs.write_bits((codec.minexp() + MINEXP_BIAS) as u64, 16);
    bs.write_bits((codec.mode() == crate::codec::Mode::Reversible) as u64, 1);
    bs.flush();
    bs.tell_w() - start
}

/// Parse a header at the current read position, leaving the cursor
/// word-aligned after it.
pub fn read_header<R: BitRead>(bs: &mut R) -> Result<Header, HeaderError> {
    if bs.read_bits(32) as u32 != MAGIC {
        return Err(HeaderError::BadMagic);
    }
    if bs.read_bits(16) as u32 != VERSION {
        return Err(HeaderError::BadVersion);
    }
    let scalar_type =
        ScalarType::from_tag(bs.read_bits(4) as u32).ok_or(HeaderError::BadField)?;
    let d = bs.read_bits(3) as usize;
    if !(1..=4).contains(&d) {
        return Err(HeaderError::BadField);
    }
    let mut dims = [0usize; 4];
    for n in dims.iter_mut().take(d) {
        *n = bs.read_bits(SIZE_BITS) as usize;
        if *n == 0 {
            return Err(HeaderError::BadField);
        }
    }

    let minbits = bs.read_bits(16) as u32;
    let maxbits = bs.read_bits(16) as u32;
    let maxprec = bs.read_bits(7) as u32;
    let minexp = bs.read_bits(16) as i32 - MINEXP_BIAS;
    let reversible = bs.read_bit();
    if minbits > maxbits
        || maxbits > MAX_BITS
        || !(1..=MAX_PREC).contains(&maxprec)
        || minexp < MIN_EXP
    {
        return Err(HeaderError::BadField);
    }

    let mut codec = Codec::new();
    if reversible {
        codec.set_reversible();
    } else {
        codec
            .set_params(minbits, maxbits, maxprec, minexp)
            .map_err(|_| HeaderError::BadField)?;
    }
    codec.set_execution(Execution::Serial);
    bs.align_read();

    Ok(Header {
        scalar_type,
        dims,
        codec,
    })
}
