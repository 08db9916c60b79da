use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hll_bench::aggregator::DEFAULT_CHUNK_SIZE;
use hll_bench::harness::{Harness, HarnessConfig, DEFAULT_KEY};
use hll_bench::report::{ReportFormat, ReportRow, Reporter};
use hll_bench::store::EstimatorStore;
use hll_bench::testset::TestSets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TestSetName {
    /// Mixed cardinalities from 10 up to 100 million (slow)
    Mixed,
    /// Every cardinality from 1 to 100
    Hundred,
}

impl TestSetName {
    fn as_str(self) -> &'static str {
        match self {
            TestSetName::Mixed => "mixed",
            TestSetName::Hundred => "hundred",
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "hll-bench")]
#[clap(about = "Speed and accuracy tests of a HyperLogLog cardinality estimator")]
struct Cli {
    /// Key of the estimator under test.
    #[clap(short, long, env = "HLL_BENCH_KEY", default_value = DEFAULT_KEY)]
    key: String,
    /// Set of tests to run.
    #[clap(short = 's', long, env = "HLL_BENCH_TESTSET", value_enum, default_value_t = TestSetName::Mixed)]
    testset: TestSetName,
    /// Log2 of the number of registers.
    #[clap(short, long, env = "HLL_BENCH_PRECISION", default_value_t = 14)]
    precision: u8,
    /// Largest number of items inserted in one chunk.
    #[clap(
        long,
        env = "HLL_BENCH_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    chunk_size: u64,
    /// Skip test entries above this cardinality.
    #[clap(long, env = "HLL_BENCH_MAX_CARDINALITY")]
    max_cardinality: Option<u64>,
    /// Output format of the results.
    #[clap(long, env = "HLL_BENCH_FORMAT", value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,
}

fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")
}

fn run<W: Write>(cli: Cli, out: W) -> Result<Vec<ReportRow>> {
    let test_sets = TestSets::builtin();
    let mut test_set = test_sets
        .get(cli.testset.as_str())
        .cloned()
        .ok_or_else(|| anyhow!("unknown test set: {}", cli.testset.as_str()))?;
    if let Some(max) = cli.max_cardinality {
        test_set = test_set.up_to(max);
    }

    let mut store = EstimatorStore::<wyhash::WyHash>::new(cli.precision)
        .context("failed to create estimator store")?;
    let config = HarnessConfig::new(test_set)
        .with_key(cli.key)
        .with_chunk_size(cli.chunk_size);
    let reporter = Reporter::new(cli.format, out);

    let mut harness = Harness::new(&mut store, config, reporter);
    harness.run().context("benchmark run failed")
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    run(cli, io::stdout().lock())?;
    Ok(())
}
