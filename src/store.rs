//! In-process keyed store of estimators.
//!
//! Mirrors the commands a cardinality-counting data store exposes
//! (`PFADD`, `PFCOUNT`, `PFMERGE`, `DEL`, serialized length) so the harness
//! can be pointed at it the same way it would be pointed at a remote store.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tracing::debug;
use wyhash::WyHash;

use crate::aggregator;
use crate::error::Result;
use crate::estimator::HyperLogLog;

pub struct EstimatorStore<H: Hasher + Default = WyHash> {
    /// Empty estimator cloned for every new key
    template: HyperLogLog<H>,
    keys: HashMap<String, HyperLogLog<H>>,
}

impl<H: Hasher + Default> EstimatorStore<H> {
    /// Create empty store whose estimators all use `precision`
    pub fn new(precision: u8) -> Result<Self> {
        Ok(Self {
            template: HyperLogLog::new(precision)?,
            keys: HashMap::new(),
        })
    }

    pub fn precision(&self) -> u8 {
        self.template.precision()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&HyperLogLog<H>> {
        self.keys.get(key)
    }

    /// Remove `key`, returning whether it existed
    pub fn delete(&mut self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }

    fn entry(&mut self, key: &str) -> &mut HyperLogLog<H> {
        let template = &self.template;
        self.keys
            .entry(key.to_string())
            .or_insert_with(|| template.clone())
    }

    /// Add `items` to the estimator stored at `key`, creating it if needed.
    /// Returns the number of items submitted.
    pub fn add<T, I>(&mut self, key: &str, items: I) -> u64
    where
        T: Hash,
        I: IntoIterator<Item = T>,
    {
        aggregator::bulk_insert(self.entry(key), items, usize::MAX, |_| {})
    }

    /// Add integers `0..total` to `key` in chunks, see [`aggregator::insert_range`]
    pub fn add_range<P: FnMut(f64)>(
        &mut self,
        key: &str,
        total: u64,
        chunk_size: u64,
        progress: P,
    ) -> Result<u64> {
        aggregator::insert_range(self.entry(key), total, chunk_size, progress)
    }

    /// Return estimated cardinality of `key`, 0 for missing keys
    pub fn count(&self, key: &str) -> u64 {
        self.keys.get(key).map_or(0, HyperLogLog::count)
    }

    /// Return serialized size of the estimator at `key`
    pub fn serialized_size(&self, key: &str) -> Option<usize> {
        self.keys.get(key).map(HyperLogLog::serialized_size)
    }

    /// Merge an external estimator into `key`
    pub fn merge_from(&mut self, key: &str, other: &HyperLogLog<H>) -> Result<()> {
        self.entry(key).merge(other)
    }

    /// Store the union of `dest` and all `sources` at `dest`. Missing sources are skipped.
    pub fn merge_into(&mut self, dest: &str, sources: &[&str]) -> Result<()> {
        let mut merged = self
            .keys
            .get(dest)
            .cloned()
            .unwrap_or_else(|| self.template.clone());
        for source in sources {
            if let Some(estimator) = self.keys.get(*source) {
                merged.merge(estimator)?;
            }
        }
        self.keys.insert(dest.to_string(), merged);
        Ok(())
    }

    /// Acquire `key` for the lifetime of the returned [`Session`].
    ///
    /// Any estimator left at `key` is deleted when the session is dropped.
    pub fn session(&mut self, key: &str) -> Session<'_, H> {
        debug!(key, "acquiring session");
        Session {
            store: self,
            key: key.to_string(),
        }
    }
}

/// Exclusive handle on one key of an [`EstimatorStore`]
pub struct Session<'s, H: Hasher + Default = WyHash> {
    store: &'s mut EstimatorStore<H>,
    key: String,
}

impl<H: Hasher + Default> Session<'_, H> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn precision(&self) -> u8 {
        self.store.precision()
    }

    /// Drop whatever is stored at the key
    pub fn reset(&mut self) {
        self.store.delete(&self.key);
    }

    pub fn add_range<P: FnMut(f64)>(
        &mut self,
        total: u64,
        chunk_size: u64,
        progress: P,
    ) -> Result<u64> {
        self.store.add_range(&self.key, total, chunk_size, progress)
    }

    pub fn count(&self) -> u64 {
        self.store.count(&self.key)
    }

    /// Serialized size of the estimator, or of an empty one if nothing was added
    pub fn serialized_size(&self) -> usize {
        self.store
            .serialized_size(&self.key)
            .unwrap_or_else(|| self.store.template.serialized_size())
    }
}

impl<H: Hasher + Default> Drop for Session<'_, H> {
    fn drop(&mut self) {
        debug!(key = %self.key, "releasing session");
        self.store.delete(&self.key);
    }
}
