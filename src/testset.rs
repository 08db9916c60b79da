//! Named sequences of target cardinalities driven through the harness.

use std::collections::BTreeMap;

/// Ordered target cardinalities of one benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSet {
    name: String,
    cardinalities: Vec<u64>,
}

impl TestSet {
    pub fn new(name: impl Into<String>, cardinalities: impl IntoIterator<Item = u64>) -> Self {
        Self {
            name: name.into(),
            cardinalities: cardinalities.into_iter().collect(),
        }
    }

    /// Mixed small and large cardinalities. The last entry takes a long time.
    pub fn mixed() -> Self {
        Self::new(
            "mixed",
            [
                10,
                20,
                100,
                900,
                1_000,
                2_000,
                5_000,
                10_000,
                50_000,
                200_000,
                500_000,
                800_000,
                1_000_000,
                5_000_000,
                10_000_000,
                100_000_000,
            ],
        )
    }

    /// Every cardinality from 1 to 100.
    pub fn hundred() -> Self {
        Self::new("hundred", 1..=100)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinalities(&self) -> &[u64] {
        &self.cardinalities
    }

    pub fn len(&self) -> usize {
        self.cardinalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cardinalities.is_empty()
    }

    /// Drop entries above `max` cardinality
    pub fn up_to(mut self, max: u64) -> Self {
        self.cardinalities.retain(|&c| c <= max);
        self
    }
}

/// Registry of test sets addressable by name
#[derive(Debug, Clone, Default)]
pub struct TestSets {
    sets: BTreeMap<String, TestSet>,
}

impl TestSets {
    /// Registry holding the `mixed` and `hundred` test sets
    pub fn builtin() -> Self {
        let mut sets = Self::default();
        sets.register(TestSet::mixed());
        sets.register(TestSet::hundred());
        sets
    }

    /// Add `set`, replacing any set registered under the same name
    pub fn register(&mut self, set: TestSet) {
        self.sets.insert(set.name.clone(), set);
    }

    pub fn get(&self, name: &str) -> Option<&TestSet> {
        self.sets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}
