use strata_copula::CopulaError;
use thiserror::Error;

/// Errors emitted while modeling a dataset.
#[derive(Debug, Error)]
pub enum ModelerError {
    /// Fitting or rebuilding a model failed; passed through unchanged.
    #[error(transparent)]
    Model(#[from] CopulaError),
    #[error(transparent)]
    Core(#[from] strata_core::Error),
    #[error("table '{child}' has no field referencing '{parent}.{primary_key}'")]
    MissingForeignKey {
        child: String,
        parent: String,
        primary_key: String,
    },
    #[error("table '{0}' has children but no primary key")]
    MissingPrimaryKey(String),
    #[error("relationship cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("cannot unflatten parameters: {0}")]
    Unflatten(String),
    #[error("modeler state is inconsistent: {0}")]
    Inconsistent(String),
}

/// Result type for modeler operations.
pub type ModelerResult<T> = std::result::Result<T, ModelerError>;
