//! Deterministic synthetic fields for tests and benchmarks.
//!
//! Two families: smooth separable ramps that compress well (the shape the
//! codec is designed for) and xorshift noise that does not.  Everything
//! is seeded and reproducible; no RNG crate, no wall clock.

/// Smooth separable field: the product over axes of (1 − t²) with
/// t ∈ [−1, 1] across each axis, plus a small linear tilt so no two
/// cells are equal.
pub fn smooth_f64(dims: [usize; 4]) -> Vec<f64> {
    let d = dims.iter().take_while(|&&n| n > 0).count();
    let total: usize = dims.iter().take(d).product();
    let mut out = Vec::with_capacity(total);
    for flat in 0..total {
        let mut rem = flat;
        let mut v = 1.0f64;
        let mut tilt = 0.0f64;
        for &n in dims.iter().take(d) {
            let c = rem % n;
            rem /= n;
            let t = if n > 1 {
                2.0 * c as f64 / (n - 1) as f64 - 1.0
            } else {
                0.0
            };
            v *= 1.0 - t * t;
            tilt += c as f64;
        }
        out.push(v + 1e-6 * tilt);
    }
    out
}

/// Single-precision variant of [`smooth_f64`].
pub fn smooth_f32(dims: [usize; 4]) -> Vec<f32> {
    smooth_f64(dims).into_iter().map(|v| v as f32).collect()
}

/// Deterministic xorshift64* generator.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed | 1,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

/// Noise in [−1, 1), incompressible.
pub fn noise_f64(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = XorShift64::new(seed);
    (0..len)
        .map(|_| (rng.next_u64() >> 11) as f64 / (1u64 << 52) as f64 - 1.0)
        .collect()
}

/// Integer ramp with a deterministic ripple, bounded to the transform's
/// safe range (|v| < 2^30).
pub fn ramp_i32(len: usize, seed: u64) -> Vec<i32> {
    let mut rng = XorShift64::new(seed);
    (0..len)
        .map(|i| (i as i32).wrapping_mul(37) + (rng.next_u64() % 1024) as i32 - 512)
        .collect()
}

/// 64-bit integer noise spanning the full value range (reversible-mode
/// stress data; the transform wraps by design).
pub fn noise_i64(len: usize, seed: u64) -> Vec<i64> {
    let mut rng = XorShift64::new(seed);
    (0..len).map(|_| rng.next_u64() as i64).collect()
}
