//! Benchmark harness driving an [`EstimatorStore`] through a [`TestSet`].
//!
//! For every target cardinality the harness resets the key under test,
//! inserts that many distinct integers (timed), asks for the estimate (timed)
//! and emits a [`ReportRow`]. Any error aborts the whole run.

use std::hash::Hasher;
use std::time::Instant;

use tracing::{debug, info};
use wyhash::WyHash;

use crate::aggregator::DEFAULT_CHUNK_SIZE;
use crate::error::Result;
use crate::report::{ReportRow, ReportSink};
use crate::store::EstimatorStore;
use crate::testset::TestSet;

/// Default key of the estimator under test
pub const DEFAULT_KEY: &str = "hll_test";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Key the estimator under test is stored at
    pub key: String,
    /// Largest number of items submitted at once
    pub chunk_size: u64,
    pub test_set: TestSet,
}

impl HarnessConfig {
    pub fn new(test_set: TestSet) -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            test_set,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Step of the harness for the current test-set entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Preparing,
    Inserting,
    Estimating,
    Reporting,
    Done,
}

pub struct Harness<'s, S: ReportSink, H: Hasher + Default = WyHash> {
    store: &'s mut EstimatorStore<H>,
    config: HarnessConfig,
    sink: S,
    phase: Phase,
}

impl<'s, S: ReportSink, H: Hasher + Default> Harness<'s, S, H> {
    pub fn new(store: &'s mut EstimatorStore<H>, config: HarnessConfig, sink: S) -> Self {
        Self {
            store,
            config,
            sink,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run every entry of the configured test set, returning the emitted rows
    pub fn run(&mut self) -> Result<Vec<ReportRow>> {
        let key = self.config.key.as_str();
        let test_set = &self.config.test_set;
        info!(
            key,
            test_set = test_set.name(),
            entries = test_set.len(),
            precision = self.store.precision(),
            chunk_size = self.config.chunk_size,
            "starting benchmark run"
        );

        self.sink.begin(key, test_set)?;
        let mut session = self.store.session(key);
        let mut rows = Vec::with_capacity(test_set.len());

        for &expected in test_set.cardinalities() {
            self.phase = Phase::Preparing;
            session.reset();

            self.phase = Phase::Inserting;
            debug!(expected, "inserting items");
            let sink = &mut self.sink;
            let start = Instant::now();
            session.add_range(expected, self.config.chunk_size, |fraction| {
                sink.progress(fraction)
            })?;
            let insert_time = start.elapsed();

            self.phase = Phase::Estimating;
            let start = Instant::now();
            let count = session.count();
            let count_time = start.elapsed();

            self.phase = Phase::Reporting;
            let row = ReportRow::new(
                expected,
                count,
                session.serialized_size(),
                insert_time,
                count_time,
            );
            debug!(
                expected,
                count,
                diff_percent = row.diff_percent,
                ?insert_time,
                ?count_time,
                "entry done"
            );
            self.sink.row(&row)?;
            rows.push(row);
        }

        drop(session);
        self.sink.finish()?;
        self.phase = Phase::Done;
        info!(key, rows = rows.len(), "benchmark run finished");

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct CollectSink {
        begun: Option<(String, String)>,
        progress: Vec<f64>,
        rows: Vec<ReportRow>,
        finished: bool,
    }

    impl ReportSink for CollectSink {
        fn begin(&mut self, key: &str, test_set: &TestSet) -> Result<()> {
            self.begun = Some((key.to_string(), test_set.name().to_string()));
            Ok(())
        }

        fn progress(&mut self, fraction: f64) {
            self.progress.push(fraction);
        }

        fn row(&mut self, row: &ReportRow) -> Result<()> {
            self.rows.push(row.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_run_hundred() {
        let mut store = EstimatorStore::<WyHash>::new(14).unwrap();
        let config = HarnessConfig::new(TestSet::hundred().up_to(10)).with_key("small");
        let mut harness = Harness::new(&mut store, config, CollectSink::default());
        assert_eq!(harness.phase(), Phase::Idle);

        let rows = harness.run().unwrap();
        assert_eq!(harness.phase(), Phase::Done);

        let sink = harness.into_sink();
        assert_eq!(sink.begun, Some(("small".to_string(), "hundred".to_string())));
        assert!(sink.finished);
        assert!(sink.progress.is_empty());
        assert_eq!(sink.rows, rows);

        assert_eq!(rows.len(), 10);
        for (row, expected) in rows.iter().zip(1..=10u64) {
            assert_eq!(row.expected, expected);
            assert!(row.count.abs_diff(expected) <= 1, "{row:?}");
            assert_eq!(row.size, 12304);
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_run_chunked() {
        let mut store = EstimatorStore::<WyHash>::new(12).unwrap();
        let config = HarnessConfig::new(TestSet::new("chunked", [50, 3_000])).with_chunk_size(1_000);
        let mut harness = Harness::new(&mut store, config, CollectSink::default());
        let rows = harness.run().unwrap();
        let sink = harness.into_sink();

        assert_eq!(sink.progress.len(), 3);
        assert_eq!(sink.progress[0], 0.0);
        assert_eq!(rows[1].expected, 3_000);
        assert!(rows[1].diff_percent.abs() < 10.0, "{:?}", rows[1]);
        assert_eq!(rows[1].size, 3088);
    }

    #[test]
    fn test_run_aborts_on_accounting_error() {
        let mut store = EstimatorStore::<WyHash>::new(12).unwrap();
        let config = HarnessConfig::new(TestSet::new("broken", [10, 2_500, 20])).with_chunk_size(1_000);
        let mut harness = Harness::new(&mut store, config, CollectSink::default());

        let result = harness.run();
        assert!(matches!(
            result,
            Err(Error::ChunkAccounting {
                expected: 2_500,
                inserted: 3_000
            })
        ));
        assert_eq!(harness.phase(), Phase::Inserting);

        let sink = harness.into_sink();
        assert_eq!(sink.rows.len(), 1);
        assert!(!sink.finished);
        assert!(store.is_empty());
    }
}
