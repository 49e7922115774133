//! Block-pipeline building blocks: transform invertibility, the
//! negabinary mapping, traversal-order validity, and partial-block
//! padding.

use tessera::block::types::{
    block_size, fwd_xform, inv_xform, pad_line, rev_fwd_xform, rev_inv_xform, traversal_order,
    Coeff, ORDER_2,
};

// ─────────────────────────────────────────────────────────────────────────────
// Reversible transform
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reversible_transform_roundtrips_exactly() {
    for dims in 1..=4usize {
        let n = block_size(dims);
        let original: Vec<i32> = (0..n as i64)
            .map(|i| (i.wrapping_mul(0x6c8e_9cf5) ^ (i << 17)) as i32)
            .collect();
        let mut block = original.clone();
        rev_fwd_xform(&mut block, dims);
        assert_ne!(block, original, "transform must not be identity ({dims}D)");
        rev_inv_xform(&mut block, dims);
        assert_eq!(block, original, "{dims}D reversible round trip");
    }
}

#[test]
fn reversible_transform_roundtrips_at_extremes() {
    // Wraparound values exercise two's-complement overflow.
    let original: Vec<i64> = vec![
        i64::MAX,
        i64::MIN,
        -1,
        0,
        i64::MAX / 3,
        i64::MIN / 7,
        42,
        -42,
        1 << 62,
        -(1 << 61),
        i64::MAX,
        i64::MIN + 1,
        7,
        -7,
        1,
        -2,
    ];
    let mut block = original.clone();
    rev_fwd_xform(&mut block, 2);
    rev_inv_xform(&mut block, 2);
    assert_eq!(block, original);
}

// ─────────────────────────────────────────────────────────────────────────────
// Lossy transform
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn lossy_transform_roundtrip_error_is_small() {
    // The near-orthogonal lift discards low-order bits; the round trip is
    // close, not exact.
    for dims in 1..=3usize {
        let n = block_size(dims);
        let original: Vec<i32> = (0..n as i32).map(|i| i * 1000 - 7777).collect();
        let mut block = original.clone();
        fwd_xform(&mut block, dims);
        inv_xform(&mut block, dims);
        for (a, b) in original.iter().zip(block.iter()) {
            assert!((a - b).abs() <= 256, "{dims}D: {a} vs {b}");
        }
    }
}

#[test]
fn lossy_transform_concentrates_constant_into_dc() {
    let mut block = [4096i32; 16];
    fwd_xform(&mut block, 2);
    assert_eq!(block[0], 4096, "DC keeps the mean");
    assert!(
        block[1..].iter().all(|&c| c == 0),
        "constant block has no AC energy: {block:?}"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Negabinary
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn negabinary_roundtrips() {
    for v in [
        0i32,
        1,
        -1,
        2,
        -2,
        1234,
        -4321,
        i32::MAX,
        i32::MIN,
        0x2aaa_aaaa,
        -0x2aaa_aaaa,
    ] {
        assert_eq!(i32::from_negabinary(v.to_negabinary()), v);
    }
    for v in [0i64, 5, -5, i64::MAX, i64::MIN, 1 << 40, -(1 << 40)] {
        assert_eq!(i64::from_negabinary(v.to_negabinary()), v);
    }
}

#[test]
fn negabinary_of_small_values_has_small_support() {
    // The point of negabinary: small magnitudes occupy only low planes,
    // so dropping high-to-low never inflates a small value.
    for v in -8i32..=8 {
        let u = v.to_negabinary();
        assert!(u < 32, "negabinary({v}) = {u:#x} should stay in low planes");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traversal orders
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn orders_are_permutations() {
    for dims in 1..=4usize {
        let order = traversal_order(dims);
        let n = block_size(dims);
        assert_eq!(order.len(), n);
        let mut seen = vec![false; n];
        for &idx in order {
            assert!(!seen[idx as usize], "{dims}D: duplicate {idx}");
            seen[idx as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}

#[test]
fn orders_ascend_by_total_frequency() {
    for dims in 1..=4usize {
        let order = traversal_order(dims);
        let sum_of = |mut idx: usize| {
            let mut s = 0;
            for _ in 0..dims {
                s += idx & 3;
                idx >>= 2;
            }
            s
        };
        for pair in order.windows(2) {
            assert!(
                sum_of(pair[0] as usize) <= sum_of(pair[1] as usize),
                "{dims}D order not monotone at {pair:?}"
            );
        }
    }
}

#[test]
fn order_2d_starts_at_dc() {
    assert_eq!(ORDER_2[0], 0);
    // The three frequency-1 coefficients follow in some order.
    let mut next: Vec<u16> = ORDER_2[1..3].to_vec();
    next.sort_unstable();
    assert_eq!(next, vec![1, 4]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial-block padding
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn pad_line_mirrors_valid_samples() {
    let mut line = [10i32, 20, 0, 0];
    pad_line(&mut line, 0, 1, 2);
    assert_eq!(line, [10, 20, 10, 20], "n=2 extends periodically");

    let mut line = [7i32, 0, 0, 0];
    pad_line(&mut line, 0, 1, 1);
    assert_eq!(line, [7, 7, 7, 7], "n=1 replicates");

    let mut line = [1i32, 2, 3, 0];
    pad_line(&mut line, 0, 1, 3);
    assert_eq!(line, [1, 2, 3, 2], "n=3 reflects");

    let mut line = [9i32, 9, 9, 9];
    pad_line(&mut line, 0, 1, 0);
    assert_eq!(line, [0, 0, 0, 0], "n=0 zero-fills");
}

#[test]
fn pad_line_respects_stride() {
    let mut block = [0i32; 16];
    block[0] = 5;
    // Pad along y (stride 4) with one valid row.
    pad_line(&mut block, 0, 4, 1);
    assert_eq!(block[4], 5);
    assert_eq!(block[8], 5);
    assert_eq!(block[12], 5);
}
