use std::fmt;

use strata_core::Frame;

use crate::errors::{CopulaError, CopulaResult};
use crate::multivariate::GaussianMultivariate;
use crate::params::ParamValue;
use crate::univariate::Distribution;

/// A fitted multivariate model, opaque to the modeler beyond its parameters.
pub trait FittedModel: fmt::Debug + Send + Sync {
    /// Fully-qualified type name of the model.
    fn model_type(&self) -> &str;
    /// Columns the model was fitted on, in order.
    fn columns(&self) -> &[String];
    /// Univariate family used for the marginals.
    fn distribution(&self) -> Distribution;
    /// Nested parameter structure describing the model.
    fn to_dict(&self) -> ParamValue;
}

/// A multivariate model family that can be fitted to numeric tables.
pub trait ModelFamily: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn fit(
        &self,
        data: &Frame<f64>,
        distribution: Distribution,
    ) -> CopulaResult<Box<dyn FittedModel>>;

    /// Rebuild a fitted model from its nested parameters.
    fn from_params(&self, params: &ParamValue) -> CopulaResult<Box<dyn FittedModel>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianMultivariateFamily;

impl GaussianMultivariateFamily {
    pub const NAME: &'static str = "gaussian_multivariate";
}

impl ModelFamily for GaussianMultivariateFamily {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fit(
        &self,
        data: &Frame<f64>,
        distribution: Distribution,
    ) -> CopulaResult<Box<dyn FittedModel>> {
        Ok(Box::new(GaussianMultivariate::fit(data, distribution)?))
    }

    fn from_params(&self, params: &ParamValue) -> CopulaResult<Box<dyn FittedModel>> {
        Ok(Box::new(GaussianMultivariate::from_dict(params)?))
    }
}

/// Resolve a model family by short name or fully-qualified type name.
pub fn model_family(name: &str) -> CopulaResult<Box<dyn ModelFamily>> {
    match name {
        GaussianMultivariateFamily::NAME | GaussianMultivariate::TYPE_NAME => {
            Ok(Box::new(GaussianMultivariateFamily))
        }
        other => Err(CopulaError::UnknownModel(other.to_string())),
    }
}
