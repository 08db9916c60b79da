//! Bulk and chunked insertion of item streams into a [`HyperLogLog`].
//!
//! Chunking bounds how many items are handed over in a single call. Inside
//! the process it changes nothing about the result since insertion is
//! idempotent and order independent, but it keeps the submission pattern
//! (and the progress reporting that goes with it) of a batched store client.

use std::hash::{Hash, Hasher};
use std::ops::Range;

use tracing::trace;

use crate::error::{Error, Result};
use crate::estimator::HyperLogLog;

/// Largest number of items submitted in a single chunk by default
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Progress of a chunked insertion, handed to the caller before each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Zero-based index of the chunk about to be inserted
    pub index: usize,
    /// Items inserted by previous chunks
    pub inserted: u64,
}

/// Ranges of integers submitted for a total of `total` items.
///
/// A total that fits into one chunk is sent as the single range `0..total`.
/// Larger totals are sent as full `chunk_size` ranges, with the start
/// advanced by `chunk_size` before every range is formed, so the first range
/// is `chunk_size..2 * chunk_size`. When `total` is not a multiple of
/// `chunk_size` the last range overshoots and the accounting check in
/// [`insert_range`] fails. Ranges that would end past `u64::MAX` are never
/// formed, which also surfaces as an accounting failure.
#[derive(Debug, Clone)]
pub struct Chunks {
    start: u64,
    remaining: i128,
    chunk_size: u64,
    single: bool,
}

impl Chunks {
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self {
            start: 0,
            remaining: i128::from(total),
            chunk_size,
            single: total <= chunk_size,
        }
    }

    /// Return whether the total is submitted as more than one chunk
    pub fn is_chunked(&self) -> bool {
        !self.single
    }
}

impl Iterator for Chunks {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining <= 0 || self.chunk_size == 0 {
            return None;
        }

        if self.single {
            let range = self.start..self.start + self.remaining as u64;
            self.remaining = 0;
            return Some(range);
        }

        // ranges past `u64::MAX` end the submission, leaving the shortfall to accounting
        let next = self
            .start
            .checked_add(self.chunk_size)
            .and_then(|start| Some(start..start.checked_add(self.chunk_size)?));
        let Some(range) = next else {
            self.remaining = 0;
            return None;
        };

        self.start = range.start;
        self.remaining -= i128::from(self.chunk_size);
        Some(range)
    }
}

/// Insert every item of `items` into `estimator`, `chunk_size` items at a time.
///
/// `on_chunk` is called before each chunk. Returns the number of items inserted.
pub fn bulk_insert<T, I, H, F>(
    estimator: &mut HyperLogLog<H>,
    items: I,
    chunk_size: usize,
    mut on_chunk: F,
) -> u64
where
    T: Hash,
    I: IntoIterator<Item = T>,
    H: Hasher + Default,
    F: FnMut(ChunkProgress),
{
    let chunk_size = chunk_size.max(1);
    let mut items = items.into_iter().peekable();
    let mut inserted = 0;
    let mut index = 0;

    while items.peek().is_some() {
        on_chunk(ChunkProgress { index, inserted });
        for item in items.by_ref().take(chunk_size) {
            estimator.insert(&item);
            inserted += 1;
        }
        index += 1;
    }

    inserted
}

/// Insert `total` distinct integers into `estimator` following the [`Chunks`]
/// submission ranges.
///
/// When more than one chunk is needed, `progress` receives the fraction of
/// items already sent before each chunk. Fails with
/// [`Error::ChunkAccounting`] if the chunks did not add up to `total`.
pub fn insert_range<H, P>(
    estimator: &mut HyperLogLog<H>,
    total: u64,
    chunk_size: u64,
    mut progress: P,
) -> Result<u64>
where
    H: Hasher + Default,
    P: FnMut(f64),
{
    let chunks = Chunks::new(total, chunk_size);
    let chunked = chunks.is_chunked();
    let mut sent = 0u64;

    for (index, range) in chunks.enumerate() {
        if chunked {
            progress(sent as f64 / total as f64);
        }
        trace!(index, start = range.start, end = range.end, "inserting chunk");
        sent += bulk_insert(estimator, range, usize::MAX, |_| {});
    }

    if sent != total {
        return Err(Error::ChunkAccounting {
            expected: total,
            inserted: sent,
        });
    }

    Ok(sent)
}
