//! Statistical model capability for Strata.
//!
//! The modeler depends only on [`ModelFamily`] and [`FittedModel`]; this
//! crate provides the Gaussian copula implementation behind them and the
//! nested parameter structure ([`ParamValue`]) fitted models serialize to.

pub mod errors;
pub mod family;
pub mod multivariate;
pub mod params;
pub mod univariate;

pub use errors::{CopulaError, CopulaResult};
pub use family::{FittedModel, GaussianMultivariateFamily, ModelFamily, model_family};
pub use multivariate::GaussianMultivariate;
pub use params::ParamValue;
pub use univariate::{Distribution, Univariate};

/// Jitter added to break zero-variance columns (single-precision epsilon).
pub const EPSILON: f64 = f32::EPSILON as f64;
