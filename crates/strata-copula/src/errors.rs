use thiserror::Error;

/// Errors emitted while fitting or rebuilding models.
#[derive(Debug, Error)]
pub enum CopulaError {
    #[error("cannot fit a model on an empty table")]
    EmptyData,
    #[error("non-finite value in column '{column}' at row {row}")]
    NonFinite { column: String, row: usize },
    #[error("unsupported distribution: {0}")]
    UnsupportedDistribution(String),
    #[error("unknown model family: {0}")]
    UnknownModel(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Result type for model operations.
pub type CopulaResult<T> = std::result::Result<T, CopulaError>;
