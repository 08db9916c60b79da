use crate::estimator::{MAX_PRECISION, MIN_PRECISION};

/// Errors raised while building, combining or benchmarking estimators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "precision {precision} is outside the supported range [{min}..={max}]",
        min = MIN_PRECISION,
        max = MAX_PRECISION
    )]
    InvalidPrecision { precision: u8 },

    #[error("cannot merge estimators with different precisions ({lhs} and {rhs})")]
    PrecisionMismatch { lhs: u8, rhs: u8 },

    /// Chunked insertion did not account for exactly the requested number of items.
    #[error("chunked insertion sent {inserted} items, expected {expected}")]
    ChunkAccounting { expected: u64, inserted: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
