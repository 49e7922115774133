//! End-to-end compress/decompress properties: reversible exactness,
//! fixed-accuracy error bounds, and graceful decode of truncated
//! streams.

use test_log::test;

use tessera::codec::Codec;
use tessera::field::Field;
use tessera::testdata;
use tessera::{compress, decompress, maximum_size};

fn dims4(dims: &[usize]) -> [usize; 4] {
    let mut d = [0usize; 4];
    d[..dims.len()].copy_from_slice(dims);
    d
}

fn roundtrip<T: tessera::Scalar>(codec: &Codec, data: &[T], dims: &[usize]) -> Vec<T> {
    let field = Field::from_slice(data, dims4(dims)).unwrap();
    let mut dst = vec![0u8; maximum_size(codec, &field)];
    let written = compress(codec, &field, &mut dst).unwrap();
    assert!(written > 0 && written <= dst.len());

    let mut out = vec![T::default(); data.len()];
    let mut ofield = Field::from_slice_mut(&mut out, dims4(dims)).unwrap();
    decompress(codec, &mut ofield, &dst[..written]).unwrap();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Reversible mode is exact
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reversible_int32_is_exact_across_dims() {
    let mut codec = Codec::new();
    codec.set_reversible();
    for dims in [&[29usize][..], &[9, 7], &[6, 5, 5], &[5, 3, 3, 3]] {
        let len: usize = dims.iter().product();
        let data = testdata::ramp_i32(len, 7);
        let out = roundtrip(&codec, &data, dims);
        assert_eq!(out, data, "dims {dims:?}");
    }
}

#[test]
fn reversible_int64_full_range_is_exact() {
    let mut codec = Codec::new();
    codec.set_reversible();
    let data = testdata::noise_i64(11 * 6, 99);
    let out = roundtrip(&codec, &data, &[11, 6]);
    assert_eq!(out, data);
}

#[test]
fn reversible_float64_is_bit_exact() {
    let mut codec = Codec::new();
    codec.set_reversible();
    // Mixed magnitudes, negative zero, and subnormals: the bit-exact
    // fallback path must reproduce every encoding verbatim.
    let mut data = testdata::noise_f64(60, 3);
    data[0] = -0.0;
    data[1] = 5e-324;
    data[2] = -1.0e300;
    data[3] = 1.0e-300;
    data[17] = f64::MIN_POSITIVE / 2.0;
    let out = roundtrip(&codec, &data, &[10, 6]);
    for (a, b) in data.iter().zip(out.iter()) {
        assert_eq!(a.to_bits(), b.to_bits(), "{a} vs {b}");
    }
}

#[test]
fn reversible_float_scaling_path_is_exact() {
    let mut codec = Codec::new();
    codec.set_reversible();
    // Halves scale to integers exactly, exercising the lossless-scaling
    // branch rather than the reinterpretation fallback.
    let data: Vec<f32> = (0..48).map(|i| (i as f32 - 24.0) * 0.5).collect();
    let out = roundtrip(&codec, &data, &[8, 6]);
    for (a, b) in data.iter().zip(out.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed accuracy bounds the error
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn fixed_accuracy_respects_tolerance() {
    for &tol in &[1e-1, 1e-3, 1e-6] {
        let mut codec = Codec::new();
        codec.set_accuracy(tol).unwrap();
        let dims = [20usize, 20, 20];
        let data = testdata::smooth_f64(dims4(&dims));
        let out = roundtrip(&codec, &data, &dims);
        let max_err = data
            .iter()
            .zip(out.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        assert!(max_err <= tol, "tolerance {tol}: max error {max_err}");
    }
}

#[test]
fn tighter_tolerance_costs_more_bits() {
    let dims = [20usize, 20, 20];
    let data = testdata::smooth_f64(dims4(&dims));
    let field = Field::from_slice(&data, dims4(&dims)).unwrap();
    let mut sizes = Vec::new();
    for &tol in &[1e-1, 1e-4, 1e-8] {
        let mut codec = Codec::new();
        codec.set_accuracy(tol).unwrap();
        let mut dst = vec![0u8; maximum_size(&codec, &field)];
        sizes.push(compress(&codec, &field, &mut dst).unwrap());
    }
    assert!(sizes[0] < sizes[1] && sizes[1] < sizes[2], "{sizes:?}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed precision
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn fixed_precision_error_shrinks_with_precision() {
    let dims = [16usize, 16];
    let data = testdata::smooth_f64(dims4(&dims));
    let mut last_err = f64::INFINITY;
    for prec in [8u32, 16, 32] {
        let mut codec = Codec::new();
        codec.set_precision(prec);
        let out = roundtrip(&codec, &data, &dims);
        let max_err = data
            .iter()
            .zip(out.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        assert!(
            max_err <= last_err,
            "precision {prec} error {max_err} vs previous {last_err}"
        );
        last_err = max_err;
    }
    assert!(last_err < 1e-6, "32 planes should be plenty: {last_err}");
}

#[test]
fn lossy_integer_path_is_near_lossless_at_full_precision() {
    let mut codec = Codec::new();
    codec.set_precision(64);
    let data = testdata::ramp_i32(12 * 8, 5);
    let out = roundtrip(&codec, &data, &[12, 8]);
    for (a, b) in data.iter().zip(out.iter()) {
        assert!((a - b).abs() <= 1024, "{a} vs {b}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful degradation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn truncated_stream_decodes_without_panic() {
    let mut codec = Codec::new();
    codec.set_precision(32);
    let dims = [13usize, 9];
    let data = testdata::smooth_f64(dims4(&dims));
    let field = Field::from_slice(&data, dims4(&dims)).unwrap();
    let mut dst = vec![0u8; maximum_size(&codec, &field)];
    let written = compress(&codec, &field, &mut dst).unwrap();

    for keep in [written / 2, 8, 0] {
        let mut out = vec![0f64; data.len()];
        let mut ofield = Field::from_slice_mut(&mut out, dims4(&dims)).unwrap();
        decompress(&codec, &mut ofield, &dst[..keep]).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn zero_length_stream_decodes_to_zero() {
    let codec = Codec::new();
    let mut out = vec![1f32; 16];
    let mut ofield = Field::from_slice_mut(&mut out, dims4(&[16])).unwrap();
    decompress(&codec, &mut ofield, &[]).unwrap();
    assert!(out.iter().all(|&v| v == 0.0));
}
