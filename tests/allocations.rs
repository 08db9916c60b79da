#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use hll_bench::estimator::{MAX_PRECISION, MIN_PRECISION, REGISTER_WIDTH};
use hll_bench::HyperLogLog;
use tabled::{
    settings::{Settings, Style},
    Table, Tabled,
};
use wyhash::WyHash;

#[derive(Tabled)]
struct Record {
    precision: u8,
    cardinality: u64,
    heap_bytes: u64,
    heap_blocks: u64,
    size_of: usize,
    serialized_size: usize,
}

fn measure_memory_usage(precision: u8, cardinality: u64) -> Record {
    let _profiler = dhat::Profiler::builder().testing().build();
    let mut estimator = HyperLogLog::<WyHash>::new(precision).unwrap();
    for i in 0..cardinality {
        estimator.insert(&i);
    }
    let stats = dhat::HeapStats::get();
    Record {
        precision,
        cardinality,
        heap_bytes: stats.total_bytes,
        heap_blocks: stats.total_blocks,
        size_of: estimator.size_of(),
        serialized_size: estimator.serialized_size(),
    }
}

#[test]
fn test_allocations() {
    let results: Vec<Record> = (MIN_PRECISION..=MAX_PRECISION)
        .flat_map(|p| [0, 1_000, 100_000].map(|cardinality| (p, cardinality)))
        .map(|(p, cardinality)| measure_memory_usage(p, cardinality))
        .collect();

    for record in &results {
        let register_bytes = (((1usize << record.precision) * REGISTER_WIDTH / 32 + 1) * 4) as u64;
        // registers are allocated once, insertion never allocates
        assert_eq!(record.heap_blocks, 1, "p = {}", record.precision);
        assert_eq!(record.heap_bytes, register_bytes, "p = {}", record.precision);
        assert!(record.serialized_size < record.size_of);
    }

    let table_config = Settings::default().with(Style::markdown());
    let markdown = Table::new(results).with(table_config).to_string();
    println!("{}", markdown);
}
