//! Report rows and the sinks that render them.

use std::io::Write;
use std::time::Duration;

use enum_dispatch::enum_dispatch;
use serde::{Serialize, Serializer};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::testset::TestSet;

/// Header of the fixed-width result table
pub const TABLE_HEADER: &str = "   Expect     Count   Diff %   Size   Time_Ins  Time_Count";

/// Outcome of one test-set entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Number of distinct items inserted
    pub expected: u64,
    /// Estimated cardinality
    pub count: u64,
    /// Signed difference of `count` from `expected`, in percent
    pub diff_percent: f64,
    /// Serialized size of the estimator in bytes
    pub size: usize,
    #[serde(serialize_with = "as_secs")]
    pub insert_time: Duration,
    #[serde(serialize_with = "as_secs")]
    pub count_time: Duration,
}

impl ReportRow {
    pub fn new(
        expected: u64,
        count: u64,
        size: usize,
        insert_time: Duration,
        count_time: Duration,
    ) -> Self {
        let diff_percent = if expected == 0 {
            0.0
        } else {
            (count as f64 - expected as f64) / expected as f64 * 100.0
        };

        Self {
            expected,
            count,
            diff_percent,
            size,
            insert_time,
            count_time,
        }
    }
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Consumer of harness events.
#[enum_dispatch]
pub trait ReportSink {
    /// Called once before the first entry of `test_set` is run against `key`
    fn begin(&mut self, key: &str, test_set: &TestSet) -> Result<()>;
    /// Fraction of items already sent during a long insertion
    fn progress(&mut self, fraction: f64);
    fn row(&mut self, row: &ReportRow) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Output format of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Fixed-width table streamed row by row
    #[default]
    Table,
    /// Markdown table written once all rows are known
    Markdown,
    /// One JSON object per row
    Json,
}

/// Sinks selectable at runtime
#[enum_dispatch(ReportSink)]
pub enum Reporter<W: Write> {
    Table(TableSink<W>),
    Markdown(MarkdownSink<W>),
    Json(JsonSink<W>),
}

impl<W: Write> Reporter<W> {
    pub fn new(format: ReportFormat, out: W) -> Self {
        match format {
            ReportFormat::Table => TableSink::new(out).into(),
            ReportFormat::Markdown => MarkdownSink::new(out).into(),
            ReportFormat::Json => JsonSink::new(out).into(),
        }
    }
}

/// Fixed-width table with in-place progress updates
pub struct TableSink<W: Write> {
    out: W,
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TableSink<W> {
    fn begin(&mut self, _key: &str, _test_set: &TestSet) -> Result<()> {
        writeln!(self.out, "{TABLE_HEADER}")?;
        writeln!(self.out, "{}", "=".repeat(TABLE_HEADER.len()))?;
        Ok(())
    }

    fn progress(&mut self, fraction: f64) {
        let text = format!("  -> {:>5.2} % of items sent", fraction * 100.0);
        // status is best effort, the next row overwrites it
        let _ = write!(self.out, "{text}{}", "\x08".repeat(text.len()));
        let _ = self.out.flush();
    }

    fn row(&mut self, row: &ReportRow) -> Result<()> {
        writeln!(
            self.out,
            "{:>9} {:>9} {:>8.2} {:>6} {:>10.5}  {:>10.5}",
            row.expected,
            row.count,
            row.diff_percent,
            row.size,
            row.insert_time.as_secs_f64(),
            row.count_time.as_secs_f64()
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Tabled)]
struct MarkdownRecord {
    #[tabled(rename = "Expect")]
    expect: u64,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Diff %")]
    diff: String,
    #[tabled(rename = "Size")]
    size: usize,
    #[tabled(rename = "Time_Ins")]
    time_ins: String,
    #[tabled(rename = "Time_Count")]
    time_count: String,
}

/// Markdown table rendered on `finish`
pub struct MarkdownSink<W: Write> {
    out: W,
    records: Vec<MarkdownRecord>,
}

impl<W: Write> MarkdownSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            records: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for MarkdownSink<W> {
    fn begin(&mut self, _key: &str, _test_set: &TestSet) -> Result<()> {
        self.records.clear();
        Ok(())
    }

    fn progress(&mut self, _fraction: f64) {}

    fn row(&mut self, row: &ReportRow) -> Result<()> {
        self.records.push(MarkdownRecord {
            expect: row.expected,
            count: row.count,
            diff: format!("{:.2}", row.diff_percent),
            size: row.size,
            time_ins: format!("{:.5}", row.insert_time.as_secs_f64()),
            time_count: format!("{:.5}", row.count_time.as_secs_f64()),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let table_config = Settings::default().with(Style::markdown());
        let records = std::mem::take(&mut self.records);
        writeln!(self.out, "{}", Table::new(records).with(table_config))?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    key: &'a str,
    testset: &'a str,
    #[serde(flatten)]
    row: &'a ReportRow,
}

/// Newline-delimited JSON, one object per row
pub struct JsonSink<W: Write> {
    out: W,
    key: String,
    test_set: String,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            key: String::new(),
            test_set: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn begin(&mut self, key: &str, test_set: &TestSet) -> Result<()> {
        self.key = key.to_string();
        self.test_set = test_set.name().to_string();
        Ok(())
    }

    fn progress(&mut self, _fraction: f64) {}

    fn row(&mut self, row: &ReportRow) -> Result<()> {
        let line = JsonLine {
            key: &self.key,
            testset: &self.test_set,
            row,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
