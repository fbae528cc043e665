use thiserror::Error;

/// Core error type shared across Strata crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Table metadata violates internal invariants.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// A table name was not found in the dataset.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// Two frames that must share an index do not.
    #[error("misaligned frames: {0}")]
    Alignment(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by Strata crates.
pub type Result<T> = std::result::Result<T, Error>;
