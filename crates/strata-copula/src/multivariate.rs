use ndarray::{Array2, Axis};
use strata_core::Frame;

use crate::errors::{CopulaError, CopulaResult};
use crate::family::FittedModel;
use crate::params::ParamValue;
use crate::univariate::{Distribution, Univariate};

/// Gaussian copula over per-column univariate marginals.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMultivariate {
    columns: Vec<String>,
    distribution: Distribution,
    distribs: Vec<Univariate>,
    covariance: Array2<f64>,
}

impl GaussianMultivariate {
    pub const TYPE_NAME: &'static str = "strata_copula::multivariate::GaussianMultivariate";

    /// Fit marginals of the given family to each column, then estimate the
    /// covariance (ddof = 1) of the standard-normal scores.
    pub fn fit(data: &Frame<f64>, distribution: Distribution) -> CopulaResult<Self> {
        if data.is_empty() {
            return Err(CopulaError::EmptyData);
        }

        let rows = data.len();
        let mut scores = Array2::<f64>::zeros((rows, data.width()));
        let mut distribs = Vec::with_capacity(data.width());

        for (position, (name, values)) in data.iter_columns().enumerate() {
            if let Some(row) = values.iter().position(|value| !value.is_finite()) {
                return Err(CopulaError::NonFinite {
                    column: name.to_string(),
                    row: data.index()[row],
                });
            }
            let marginal = distribution.fit(values)?;
            for (row, value) in values.iter().enumerate() {
                scores[[row, position]] = marginal.to_standard_normal(*value);
            }
            distribs.push(marginal);
        }

        Ok(Self {
            columns: data.columns().to_vec(),
            distribution,
            distribs,
            covariance: covariance(&scores),
        })
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn distribs(&self) -> &[Univariate] {
        &self.distribs
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Rebuild a model from the output of [`FittedModel::to_dict`].
    pub fn from_dict(params: &ParamValue) -> CopulaResult<Self> {
        let distribution = match params.get("distribution").and_then(ParamValue::as_str) {
            Some(name) => name.parse()?,
            None => Distribution::default(),
        };

        let columns = params
            .get("columns")
            .and_then(ParamValue::as_sequence)
            .ok_or_else(|| CopulaError::InvalidParams("missing 'columns'".to_string()))?
            .iter()
            .map(|column| {
                column
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| CopulaError::InvalidParams("non-text column name".to_string()))
            })
            .collect::<CopulaResult<Vec<String>>>()?;

        let distribs_params = params
            .get("distribs")
            .ok_or_else(|| CopulaError::InvalidParams("missing 'distribs'".to_string()))?;
        let distribs = columns
            .iter()
            .map(|column| {
                let marginal = distribs_params.get(column).ok_or_else(|| {
                    CopulaError::InvalidParams(format!("missing marginal for '{column}'"))
                })?;
                Univariate::from_dict(marginal, distribution)
            })
            .collect::<CopulaResult<Vec<Univariate>>>()?;

        let width = columns.len();
        let rows = params
            .get("covariance")
            .and_then(ParamValue::as_sequence)
            .ok_or_else(|| CopulaError::InvalidParams("missing 'covariance'".to_string()))?;
        if rows.len() != width {
            return Err(CopulaError::InvalidParams(format!(
                "covariance has {} rows for {width} columns",
                rows.len()
            )));
        }
        let mut covariance = Array2::<f64>::zeros((width, width));
        for (i, row) in rows.iter().enumerate() {
            let cells = row
                .as_sequence()
                .filter(|cells| cells.len() == width)
                .ok_or_else(|| {
                    CopulaError::InvalidParams(format!("covariance row {i} is not {width} wide"))
                })?;
            for (j, cell) in cells.iter().enumerate() {
                covariance[[i, j]] = cell.as_f64().ok_or_else(|| {
                    CopulaError::InvalidParams(format!("non-numeric covariance cell {i},{j}"))
                })?;
            }
        }

        Ok(Self {
            columns,
            distribution,
            distribs,
            covariance,
        })
    }
}

impl FittedModel for GaussianMultivariate {
    fn model_type(&self) -> &str {
        Self::TYPE_NAME
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn distribution(&self) -> Distribution {
        self.distribution
    }

    fn to_dict(&self) -> ParamValue {
        let covariance = self
            .covariance
            .rows()
            .into_iter()
            .map(|row| ParamValue::from(row.to_vec()))
            .collect::<Vec<_>>();
        let distribs = self
            .columns
            .iter()
            .zip(&self.distribs)
            .map(|(column, marginal)| (column.clone(), marginal.to_dict()));

        ParamValue::mapping([
            ("type", ParamValue::from(Self::TYPE_NAME)),
            ("fitted", ParamValue::from(true)),
            ("distribution", ParamValue::from(self.distribution.fqn())),
            (
                "columns",
                ParamValue::Sequence(
                    self.columns
                        .iter()
                        .map(|column| ParamValue::from(column.as_str()))
                        .collect(),
                ),
            ),
            ("covariance", ParamValue::from(covariance)),
            ("distribs", ParamValue::mapping(distribs)),
        ])
    }
}

fn covariance(scores: &Array2<f64>) -> Array2<f64> {
    let (rows, width) = scores.dim();
    if rows < 2 {
        return Array2::from_elem((width, width), f64::NAN);
    }
    let Some(means) = scores.mean_axis(Axis(0)) else {
        return Array2::from_elem((width, width), f64::NAN);
    };
    let centered = scores - &means;
    centered.t().dot(&centered) / (rows - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Frame<f64> {
        Frame::new(
            vec!["0".to_string(), "1".to_string(), "2".to_string()],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn fits_identity_covariance() {
        let model = GaussianMultivariate::fit(&identity(), Distribution::Gaussian).unwrap();
        let covariance = model.covariance();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.5 } else { -0.75 };
                assert!((covariance[[i, j]] - expected).abs() < 1e-9, "cell {i},{j}");
            }
        }
    }

    #[test]
    fn rejects_missing_values() {
        let frame = Frame::new(vec!["a".to_string()], vec![vec![1.0, f64::NAN]]).unwrap();
        let err = GaussianMultivariate::fit(&frame, Distribution::Gaussian).unwrap_err();
        assert!(matches!(err, CopulaError::NonFinite { row: 1, .. }));
    }

    #[test]
    fn rejects_empty_tables() {
        let frame = Frame::<f64>::new(vec!["a".to_string()], vec![Vec::new()]).unwrap();
        assert!(matches!(
            GaussianMultivariate::fit(&frame, Distribution::Gaussian),
            Err(CopulaError::EmptyData)
        ));
    }

    #[test]
    fn single_row_has_undefined_covariance() {
        let frame = Frame::new(vec!["a".to_string()], vec![vec![2.0]]).unwrap();
        let model = GaussianMultivariate::fit(&frame, Distribution::Gaussian).unwrap();
        assert!(model.covariance()[[0, 0]].is_nan());
    }

    #[test]
    fn rebuilds_from_dict() {
        let model = GaussianMultivariate::fit(&identity(), Distribution::Uniform).unwrap();
        let rebuilt = GaussianMultivariate::from_dict(&model.to_dict()).unwrap();
        assert_eq!(rebuilt, model);
    }
}
