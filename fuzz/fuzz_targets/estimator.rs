#![no_main]

use hll_bench::estimator::{MAX_PRECISION, MIN_PRECISION};
use hll_bench::HyperLogLog;
use libfuzzer_sys::fuzz_target;
use wyhash::{wyhash, WyHash};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = MIN_PRECISION + data[0] % (MAX_PRECISION - MIN_PRECISION + 1);
    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut estimator1 = HyperLogLog::<WyHash>::new(precision).unwrap();
    for chunk in first_half.chunks(4) {
        estimator1.insert(&chunk);
        assert!(estimator1.estimate() > 0.0);
        assert!(estimator1.size_of() > 0);
    }

    let mut estimator2 = HyperLogLog::<WyHash>::new(precision).unwrap();
    for chunk in second_half.chunks(4) {
        estimator2.insert(&chunk);
        assert!(estimator2.estimate() > 0.0);
    }

    let mut merged1 = estimator1.clone();
    merged1.merge(&estimator2).unwrap();
    let mut merged2 = estimator2.clone();
    merged2.merge(&estimator1).unwrap();
    assert_eq!(merged1, merged2);
    assert_eq!(merged1.estimate(), merged2.estimate());
});
