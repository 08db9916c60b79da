//! `hll-bench` measures how well a HyperLogLog cardinality estimator counts:
//! it inserts graduated numbers of distinct items and reports the estimate,
//! its relative error, the serialized size of the structure and the time spent
//! inserting and counting.
//!
//! The estimator itself ([`HyperLogLog`]) is a bounded-memory sketch with
//! `2^p` six-bit registers supporting insertion, merge and estimation.
pub mod aggregator;
pub mod error;
pub mod estimator;
pub mod harness;
pub mod report;
pub mod store;
pub mod testset;

pub use error::{Error, Result};
pub use estimator::HyperLogLog;
