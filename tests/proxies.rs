//! Proxy handles: references, pointers, and the block-order iterator.

use std::collections::BTreeSet;

use tessera::CompressedArray;

// ─────────────────────────────────────────────────────────────────────────────
// References
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reference_get_set_revalidates_each_access() {
    let arr = CompressedArray::<f64, 2>::new([10, 10], 32.0).unwrap();
    let r = arr.at([3, 4]);
    r.set(6.25);
    assert_eq!(r.get(), 6.25);
    // A second handle to the same cell observes the write.
    assert_eq!(arr.at([3, 4]).get(), 6.25);
}

#[test]
fn reference_assignment_copies_value() {
    let arr = CompressedArray::<f64, 1>::new([16], 32.0).unwrap();
    arr.set([2], 7.5);
    let src = arr.at([2]);
    let dst = arr.at([9]);
    dst.assign_from(&src);
    assert_eq!(arr.get([9]), 7.5);
}

#[test]
fn reference_exposes_coordinates() {
    let arr = CompressedArray::<f32, 3>::new([6, 5, 4], 8.0).unwrap();
    let r = arr.at([2, 3, 1]);
    assert_eq!(r.i(), 2);
    assert_eq!(r.j(), 3);
    assert_eq!(r.k(), 1);
    assert_eq!(r.coords(), [2, 3, 1]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Pointers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn pointer_walks_flat_order() {
    let arr = CompressedArray::<f64, 2>::new([8, 4], 32.0).unwrap();
    for f in 0..32usize {
        arr.set_flat(f, f as f64);
    }
    let mut p = arr.ptr(0);
    for f in 0..32 {
        assert_eq!(p.get(), f as f64);
        p += 1;
    }
}

#[test]
fn pointer_difference_is_flat_distance() {
    let arr = CompressedArray::<f32, 1>::new([64], 8.0).unwrap();
    let p = arr.ptr(5);
    let q = arr.ptr(21);
    assert_eq!(q - p, 16);
    assert_eq!(p - q, -16);
    assert_eq!(p.distance_to(&q), 16);
    assert_eq!((p + 16), q);
    assert_eq!((q - 16), p);
}

#[test]
fn pointers_order_by_flat_index() {
    let arr = CompressedArray::<f32, 1>::new([64], 8.0).unwrap();
    let p = arr.ptr(5);
    let q = arr.ptr(21);
    assert!(p < q);
    assert!(q > p);
    assert_eq!(p, arr.ptr(5));
}

#[test]
fn pointers_into_different_arrays_are_unordered() {
    let a = CompressedArray::<f32, 1>::new([16], 8.0).unwrap();
    let b = CompressedArray::<f32, 1>::new([16], 8.0).unwrap();
    let p = a.ptr(0);
    let q = b.ptr(0);
    assert_ne!(p, q);
    assert_eq!(p.partial_cmp(&q), None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Iterator
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn iterator_visits_every_cell_exactly_once() {
    // Non-multiple-of-4 dims exercise partial edge blocks.
    let arr = CompressedArray::<f32, 2>::new([7, 5], 8.0).unwrap();
    let mut seen = BTreeSet::new();
    for r in arr.iter() {
        let c = r.coords();
        assert!(c[0] < 7 && c[1] < 5, "out of bounds: {c:?}");
        assert!(seen.insert(c), "duplicate visit: {c:?}");
    }
    assert_eq!(seen.len(), 35, "visited set is the full Cartesian product");
}

#[test]
fn iterator_visits_blocks_contiguously() {
    let arr = CompressedArray::<f32, 2>::new([8, 8], 8.0).unwrap();
    let mut last_block = None;
    let mut blocks_seen = Vec::new();
    for r in arr.iter() {
        let c = r.coords();
        let block = (c[0] / 4, c[1] / 4);
        if last_block != Some(block) {
            assert!(
                !blocks_seen.contains(&block),
                "block {block:?} revisited after leaving"
            );
            blocks_seen.push(block);
            last_block = Some(block);
        }
    }
    assert_eq!(blocks_seen.len(), 4);
}

#[test]
fn iterator_writes_cluster_on_cached_blocks() {
    let arr = CompressedArray::<f64, 3>::new([9, 9, 9], 16.0).unwrap();
    let mut n = 0usize;
    for r in arr.iter() {
        r.set(n as f64 * 0.5);
        n += 1;
    }
    assert_eq!(n, 9 * 9 * 9);
    arr.flush_cache();
    // Spot-check a few cells after write-back.
    let probe = arr.at([4, 4, 4]);
    assert!(probe.get().is_finite());
}

#[test]
fn one_dimensional_iterator_is_random_access() {
    let arr = CompressedArray::<f64, 1>::new([40], 32.0).unwrap();
    for f in 0..40usize {
        arr.set_flat(f, f as f64);
    }
    let mut it = arr.iter();
    it.seek(25);
    let r = it.next().unwrap();
    assert_eq!(r.index(), 25);
    // Blocks cycled through the small default cache, so the value has
    // been through one encode/decode at rate 32.
    assert!((r.get() - 25.0).abs() < 1e-3);
}
