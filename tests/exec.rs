//! Execution-policy contracts: the parallel path is bit-identical to
//! serial, and offload backends reject what they cannot reproduce
//! without touching the stream.

use test_log::test;

use tessera::codec::{Codec, Execution};
use tessera::driver::offload::{OffloadBackend, ReferenceOffload};
use tessera::field::Field;
use tessera::testdata;
use tessera::{compress, maximum_size};

fn dims4(dims: &[usize]) -> [usize; 4] {
    let mut d = [0usize; 4];
    d[..dims.len()].copy_from_slice(dims);
    d
}

fn compress_with(codec: &Codec, data: &[f64], dims: &[usize]) -> Vec<u8> {
    let field = Field::from_slice(data, dims4(dims)).unwrap();
    let mut dst = vec![0u8; maximum_size(codec, &field)];
    let n = compress(codec, &field, &mut dst).unwrap();
    dst.truncate(n);
    dst
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel == serial, bit for bit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn parallel_fixed_rate_is_bit_identical_to_serial() {
    let dims = [17usize, 9, 5];
    let data = testdata::smooth_f64(dims4(&dims));

    let mut serial = Codec::new();
    serial.set_rate(8.0, 3, true);
    let want = compress_with(&serial, &data, &dims);

    for threads in [1usize, 2, 4, 0] {
        let mut par = serial;
        par.set_execution(Execution::Parallel { threads });
        let got = compress_with(&par, &data, &dims);
        assert_eq!(got, want, "threads={threads}");
    }
}

#[test]
fn parallel_non_fixed_rate_falls_back_to_serial() {
    let dims = [12usize, 12];
    let data = testdata::smooth_f64(dims4(&dims));

    let mut serial = Codec::new();
    serial.set_precision(20);
    let want = compress_with(&serial, &data, &dims);

    let mut par = serial;
    par.set_execution(Execution::Parallel { threads: 3 });
    let got = compress_with(&par, &data, &dims);
    assert_eq!(got, want);
}

// ─────────────────────────────────────────────────────────────────────────────
// Offload contract
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn offload_backend_rejects_non_fixed_rate_untouched() {
    let dims = [8usize, 8];
    let data = testdata::smooth_f64(dims4(&dims));
    let field = Field::from_slice(&data, dims4(&dims)).unwrap();

    let mut codec = Codec::new();
    codec.set_precision(16);
    assert!(!ReferenceOffload.supports(&codec));

    let mut dst = vec![0xa5u8; 4096];
    let before = dst.clone();
    let n = ReferenceOffload.compress::<f64, 2>(&codec, &field, &mut dst);
    assert_eq!(n, 0, "unsupported mode returns zero");
    assert_eq!(dst, before, "stream left untouched");
}

#[test]
fn offload_backend_matches_serial_in_fixed_rate() {
    let dims = [11usize, 7];
    let data = testdata::smooth_f64(dims4(&dims));
    let field = Field::from_slice(&data, dims4(&dims)).unwrap();

    let mut codec = Codec::new();
    codec.set_rate(12.0, 2, true);
    assert!(ReferenceOffload.supports(&codec));
    let want = compress_with(&codec, &data, &dims);

    let mut dst = vec![0u8; maximum_size(&codec, &field)];
    let n = ReferenceOffload.compress::<f64, 2>(&codec, &field, &mut dst);
    assert_eq!(&dst[..n], &want[..]);
}

#[test]
fn offload_execution_policy_falls_back_for_other_modes() {
    let dims = [10usize, 10];
    let data = testdata::smooth_f64(dims4(&dims));

    let mut serial = Codec::new();
    serial.set_accuracy(1e-3).unwrap();
    let want = compress_with(&serial, &data, &dims);

    let mut off = serial;
    off.set_execution(Execution::Offload);
    let got = compress_with(&off, &data, &dims);
    assert_eq!(got, want, "driver falls back to the serial path");
}
