use hll_bench::aggregator::{insert_range, Chunks};
use hll_bench::estimator::{MAX_PRECISION, MIN_PRECISION};
use hll_bench::HyperLogLog;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use test_case::test_case;
use wyhash::WyHash;

fn estimator_from(p: u8, items: impl IntoIterator<Item = u64>) -> HyperLogLog<WyHash> {
    let mut e = HyperLogLog::new(p).unwrap();
    for i in items {
        e.insert(&i);
    }
    e
}

#[test]
fn test_empty_estimate_is_zero() {
    for p in MIN_PRECISION..=MAX_PRECISION {
        let e = HyperLogLog::<WyHash>::new(p).unwrap();
        assert_eq!(e.estimate(), 0.0, "p = {p}");
        assert_eq!(e.count(), 0, "p = {p}");
    }
}

#[test_case(4)]
#[test_case(10)]
#[test_case(14)]
fn test_duplicates_do_not_change_estimate(p: u8) {
    let once = estimator_from(p, 0..10_000);
    let twice = estimator_from(p, (0..10_000).chain(0..10_000));
    let repeated = estimator_from(p, (0..10_000).flat_map(|i| [i, i, i]));

    assert_eq!(once, twice);
    assert_eq!(once, repeated);
    assert_eq!(once.estimate(), twice.estimate());
}

#[test_case(8, 1)]
#[test_case(12, 2)]
#[test_case(14, 3)]
fn test_insertion_order_does_not_matter(p: u8, seed: u64) {
    let mut items: Vec<u64> = (0..20_000).collect();
    let ordered = estimator_from(p, items.iter().copied());

    items.shuffle(&mut StdRng::seed_from_u64(seed));
    let shuffled = estimator_from(p, items.iter().copied());

    assert_eq!(ordered, shuffled);
    assert_eq!(ordered.estimate(), shuffled.estimate());
}

#[test_case(12, 20_000, 30_000)]
#[test_case(14, 50_000, 50_000)]
#[test_case(14, 100, 900)]
fn test_merge_of_disjoint_sets_estimates_union(p: u8, a: u64, b: u64) {
    let mut lhs = estimator_from(p, 0..a);
    let rhs = estimator_from(p, a..a + b);
    lhs.merge(&rhs).unwrap();

    let union = (a + b) as f64;
    let relative_error = (lhs.estimate() - union).abs() / union;
    // five standard errors
    let bound = 5.0 * 1.04 / ((1u64 << p) as f64).sqrt();
    assert!(
        relative_error <= bound,
        "estimate {} off by {relative_error:.4}",
        lhs.estimate()
    );
    assert_eq!(lhs, estimator_from(p, 0..a + b));
}

#[test]
fn test_merge_is_commutative_and_associative() {
    let x = estimator_from(12, 0..3_000);
    let y = estimator_from(12, 2_000..9_000);
    let z = estimator_from(12, (0..5_000).map(|i| i * 31));

    let mut xy = x.clone();
    xy.merge(&y).unwrap();
    let mut yx = y.clone();
    yx.merge(&x).unwrap();
    assert_eq!(xy, yx);
    assert_eq!(xy.estimate(), yx.estimate());

    let mut xy_z = xy.clone();
    xy_z.merge(&z).unwrap();
    let mut yz = y.clone();
    yz.merge(&z).unwrap();
    let mut x_yz = x.clone();
    x_yz.merge(&yz).unwrap();
    assert_eq!(xy_z, x_yz);
    assert_eq!(xy_z.estimate(), x_yz.estimate());
}

#[test]
fn test_merge_with_empty_is_identity() {
    let x = estimator_from(10, 0..1_000);
    let mut merged = x.clone();
    merged.merge(&HyperLogLog::new(10).unwrap()).unwrap();
    assert_eq!(merged, x);
}

#[test_case(1_000, 0.05; "thousand items")]
#[test_case(100, 0.10; "hundred items")]
fn test_small_cardinality_accuracy_p14(n: u64, tolerance: f64) {
    let e = estimator_from(14, 0..n);
    let relative_error = (e.estimate() - n as f64).abs() / n as f64;
    assert!(relative_error <= tolerance, "estimate {}", e.estimate());
}

#[test]
fn test_chunked_insertion_of_two_million_items() {
    let ranges: Vec<_> = Chunks::new(2_000_000, 1_000_000).collect();
    assert_eq!(ranges, vec![1_000_000..2_000_000, 2_000_000..3_000_000]);

    let mut e = HyperLogLog::<WyHash>::new(14).unwrap();
    let mut progress = Vec::new();
    let inserted = insert_range(&mut e, 2_000_000, 1_000_000, |f| progress.push(f)).unwrap();

    assert_eq!(inserted, 2_000_000);
    assert_eq!(progress, vec![0.0, 0.5]);
    assert_eq!(e, estimator_from(14, 1_000_000..3_000_000));
    let relative_error = (e.estimate() - 2_000_000.0).abs() / 2_000_000.0;
    assert!(relative_error <= 0.05, "estimate {}", e.estimate());
}

#[test]
fn test_serialized_size_depends_only_on_precision() {
    let mut previous = 0;
    for p in MIN_PRECISION..=MAX_PRECISION {
        let empty = HyperLogLog::<WyHash>::new(p).unwrap();
        let full = estimator_from(p, 0..5_000);
        assert_eq!(empty.serialized_size(), full.serialized_size(), "p = {p}");
        assert!(empty.serialized_size() > previous, "p = {p}");
        previous = empty.serialized_size();
    }
}
