//! Codec parameter block: the four numeric knobs, the mode policy that
//! sets them, and the execution policy.
//!
//! User intent (rate, precision, accuracy, reversible, expert) is
//! translated into (minbits, maxbits, maxprec, minexp); everything
//! downstream reads only the knobs.  Each setter returns the parameter
//! value actually in effect, which may differ from the request because of
//! rounding to the achievable granularity.

use core::fmt;

use crate::bitstream::{word_align_bits, WORD_BITS};
use crate::block::types::{block_size, MAX_DIMS};

// ─────────────────────────────────────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound on per-coefficient precision.
pub const MAX_PREC: u32 = 64;

/// Smallest per-block bit budget: enough for the block header (data bit,
/// reversible marker, 11-bit exponent) in every configuration.
pub const MIN_BITS: u32 = 16;

/// Largest useful per-block bit budget: the worst-case cost of a 4D
/// 64-bit block — 13 header bits plus 64 planes of 256 coefficient bits
/// and 64 group bits.  Serves as the "unbounded" maxbits value.
pub const MAX_BITS: u32 = 13 + 64 * (256 + 64);

/// Global floor for `minexp` (the f64 subnormal exponent limit; per-type
/// floors are at least this).
pub const MIN_EXP: i32 = -1074;

// ─────────────────────────────────────────────────────────────────────────────
// Modes and execution policy
// ─────────────────────────────────────────────────────────────────────────────

/// The mutually-exclusive budgeting policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every block consumes exactly the same word-aligned bit budget;
    /// blocks are independently addressable.
    FixedRate,
    /// Every coefficient keeps at most a fixed number of bit planes.
    FixedPrecision,
    /// Bit planes below an absolute error floor are dropped (floats only).
    FixedAccuracy,
    /// Bit-exact round trip through the invertible transform pipeline.
    Reversible,
    /// Caller-supplied knobs.
    Expert,
}

/// Where block compression runs.  The policy never changes the bits a
/// fixed-rate stream contains, only who produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// Single-threaded reference path.
    #[default]
    Serial,
    /// Thread-pool path; `threads == 0` means one worker per CPU.
    /// Fixed-rate mode only — other modes fall back to serial.
    Parallel { threads: usize },
    /// Accelerator backend; rejects non-fixed-rate configurations.
    Offload,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by codec configuration and the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Knobs outside their invariants, or an incompatible
    /// (mode, dimension, type) combination.
    InvalidConfig,
    /// The caller-provided compressed buffer is smaller than the
    /// conservative upper bound; nothing was written.
    Capacity { needed: usize, available: usize },
    /// A non-serial execution policy was asked for a mode it cannot
    /// handle and no fallback was permitted; the stream is untouched.
    BackendUnsupported,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidConfig => f.write_str("invalid codec configuration"),
            CodecError::Capacity { needed, available } => write!(
                f,
                "compressed buffer too small: need {needed} bytes, have {available}"
            ),
            CodecError::BackendUnsupported => {
                f.write_str("execution backend does not support this configuration")
            }
        }
    }
}

impl std::error::Error for CodecError {}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Compression parameters shared by every block of a stream.
///
/// Invariants (enforced by the setters): `minbits ≤ maxbits`,
/// `MIN_BITS ≤ maxbits`, `1 ≤ maxprec ≤ 64`, `minexp ≥ MIN_EXP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pub(crate) minbits: u32,
    pub(crate) maxbits: u32,
    pub(crate) maxprec: u32,
    pub(crate) minexp: i32,
    pub(crate) reversible: bool,
    pub(crate) exec: Execution,
}

impl Default for Codec {
    /// Near-lossless defaults: all planes kept, no truncation, serial
    /// execution.
    fn default() -> Self {
        Self {
            minbits: 1,
            maxbits: MAX_BITS,
            maxprec: MAX_PREC,
            minexp: MIN_EXP,
            reversible: false,
            exec: Execution::Serial,
        }
    }
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Knob accessors ───────────────────────────────────────────────────

    #[inline]
    pub fn minbits(&self) -> u32 {
        self.minbits
    }
    #[inline]
    pub fn maxbits(&self) -> u32 {
        self.maxbits
    }
    #[inline]
    pub fn maxprec(&self) -> u32 {
        self.maxprec
    }
    #[inline]
    pub fn minexp(&self) -> i32 {
        self.minexp
    }
    #[inline]
    pub fn execution(&self) -> Execution {
        self.exec
    }

    /// Select where block compression runs.
    pub fn set_execution(&mut self, exec: Execution) {
        self.exec = exec;
    }

    /// The budgeting policy the current knobs encode.
    pub fn mode(&self) -> Mode {
        if self.reversible {
            Mode::Reversible
        } else if self.minbits == self.maxbits
            && self.maxprec == MAX_PREC
            && self.minexp == MIN_EXP
        {
            Mode::FixedRate
        } else if self.minbits <= 1 && self.maxbits == MAX_BITS && self.minexp == MIN_EXP {
            Mode::FixedPrecision
        } else if self.minbits <= 1 && self.maxbits == MAX_BITS && self.maxprec == MAX_PREC {
            Mode::FixedAccuracy
        } else {
            Mode::Expert
        }
    }

    // ── Mode setters ─────────────────────────────────────────────────────

    /// Fixed-rate mode: every d-dimensional block consumes exactly
    /// `rate · 4^d` bits, rounded to the achievable granularity.  With
    /// `align` set the budget is also rounded up to a whole number of
    /// stream words, which is what makes blocks O(1)-addressable.
    ///
    /// Returns the effective rate in bits per value.
    pub fn set_rate(&mut self, rate: f64, dims: usize, align: bool) -> f64 {
        assert!((1..=MAX_DIMS).contains(&dims), "dimensionality out of range");
        let n = block_size(dims);
        let mut bits = (rate * n as f64).round().max(0.0) as u32;
        bits = bits.max(MIN_BITS);
        if align {
            bits = word_align_bits(bits as usize) as u32;
        }
        self.minbits = bits;
        self.maxbits = bits;
        self.maxprec = MAX_PREC;
        self.minexp = MIN_EXP;
        self.reversible = false;
        bits as f64 / n as f64
    }

    /// Fixed-precision mode: keep at most `prec` bit planes per
    /// coefficient, with no bound on block size.  Returns the effective
    /// precision.
    pub fn set_precision(&mut self, prec: u32) -> u32 {
        let p = prec.clamp(1, MAX_PREC);
        self.minbits = 0;
        self.maxbits = MAX_BITS;
        self.maxprec = p;
        self.minexp = MIN_EXP;
        self.reversible = false;
        p
    }

    /// Fixed-accuracy mode: drop bit planes whose absolute magnitude is
    /// below `tolerance` (floats only; rejected at compress time for
    /// integer fields).  Returns the effective error floor 2^minexp.
    pub fn set_accuracy(&mut self, tolerance: f64) -> Result<f64, CodecError> {
        if !(tolerance > 0.0) || !tolerance.is_finite() {
            return Err(CodecError::InvalidConfig);
        }
        // floor(log2 tolerance), exact via the exponent field.
        let raw = ((tolerance.to_bits() >> 52) & 0x7ff) as i32;
        let emin = if raw == 0 { MIN_EXP } else { (raw - 1023).max(MIN_EXP) };
        self.minbits = 0;
        self.maxbits = MAX_BITS;
        self.maxprec = MAX_PREC;
        self.minexp = emin;
        self.reversible = false;
        Ok(pow2(emin))
    }

    /// Reversible mode: the exactly-invertible pipeline, no truncation.
    pub fn set_reversible(&mut self) {
        self.minbits = 0;
        self.maxbits = MAX_BITS;
        self.maxprec = MAX_PREC;
        self.minexp = MIN_EXP;
        self.reversible = true;
    }

    /// Expert mode: caller-supplied knobs, validated against the §3
    /// invariants.  On error the previous configuration is retained.
    pub fn set_params(
        &mut self,
        minbits: u32,
        maxbits: u32,
        maxprec: u32,
        minexp: i32,
    ) -> Result<(), CodecError> {
        if minbits > maxbits
            || maxbits < MIN_BITS
            || maxbits > MAX_BITS
            || !(1..=MAX_PREC).contains(&maxprec)
            || minexp < MIN_EXP
        {
            return Err(CodecError::InvalidConfig);
        }
        self.minbits = minbits;
        self.maxbits = maxbits;
        self.maxprec = maxprec;
        self.minexp = minexp;
        self.reversible = false;
        Ok(())
    }

    /// Effective rate in bits per value for `dims`-dimensional data; only
    /// meaningful in fixed-rate mode.
    pub fn rate(&self, dims: usize) -> f64 {
        self.maxbits as f64 / block_size(dims) as f64
    }

    /// Bits per block in fixed-rate mode, `None` otherwise.
    pub fn fixed_block_bits(&self) -> Option<u32> {
        if self.mode() == Mode::FixedRate {
            Some(self.maxbits)
        } else {
            None
        }
    }

    /// True when every block occupies the same whole number of stream
    /// words, i.e. block offsets are computable without decoding.
    pub fn is_block_addressable(&self) -> bool {
        self.mode() == Mode::FixedRate && self.maxbits as usize % WORD_BITS == 0
    }
}

/// 2^e as f64, including the subnormal range.
fn pow2(e: i32) -> f64 {
    if e >= -1022 {
        f64::from_bits(((e + 1023) as u64) << 52)
    } else {
        // Subnormal: shift a one into the mantissa.
        f64::from_bits(1u64 << (e + 1074))
    }
}
