use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EPSILON;
use crate::errors::{CopulaError, CopulaResult};
use crate::params::ParamValue;

/// Univariate distribution family used for each column's marginal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Distribution {
    #[default]
    Gaussian,
    Uniform,
}

impl Distribution {
    pub const ALL: [Distribution; 2] = [Distribution::Gaussian, Distribution::Uniform];

    /// Fully-qualified name, as recorded in serialized parameters.
    pub fn fqn(self) -> &'static str {
        match self {
            Distribution::Gaussian => "strata_copula::univariate::GaussianUnivariate",
            Distribution::Uniform => "strata_copula::univariate::UniformUnivariate",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            Distribution::Gaussian => "gaussian",
            Distribution::Uniform => "uniform",
        }
    }

    /// Fit this family to the values of one column.
    pub fn fit(self, values: &[f64]) -> CopulaResult<Univariate> {
        if values.is_empty() {
            return Err(CopulaError::EmptyData);
        }
        let count = values.len() as f64;
        match self {
            Distribution::Gaussian => {
                let mean = values.iter().sum::<f64>() / count;
                let variance = values
                    .iter()
                    .map(|value| (value - mean).powi(2))
                    .sum::<f64>()
                    / count;
                Ok(Univariate::Gaussian {
                    mean,
                    std: variance.sqrt(),
                })
            }
            Distribution::Uniform => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Ok(Univariate::Uniform { min, max })
            }
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fqn())
    }
}

impl FromStr for Distribution {
    type Err = CopulaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Distribution::ALL
            .into_iter()
            .find(|candidate| candidate.fqn() == name || candidate.alias() == name)
            .ok_or_else(|| CopulaError::UnsupportedDistribution(name.to_string()))
    }
}

impl TryFrom<String> for Distribution {
    type Error = CopulaError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Distribution> for String {
    fn from(distribution: Distribution) -> Self {
        distribution.fqn().to_string()
    }
}

/// A fitted univariate marginal.
#[derive(Debug, Clone, PartialEq)]
pub enum Univariate {
    Gaussian { mean: f64, std: f64 },
    Uniform { min: f64, max: f64 },
}

impl Univariate {
    pub fn distribution(&self) -> Distribution {
        match self {
            Univariate::Gaussian { .. } => Distribution::Gaussian,
            Univariate::Uniform { .. } => Distribution::Uniform,
        }
    }

    /// Map a value onto the standard normal scale.
    ///
    /// Degenerate marginals (zero spread) map every value to `0`.
    pub fn to_standard_normal(&self, value: f64) -> f64 {
        match *self {
            Univariate::Gaussian { mean, std } => {
                if std > 0.0 {
                    (value - mean) / std
                } else {
                    0.0
                }
            }
            Univariate::Uniform { min, max } => {
                let span = max - min;
                if span > 0.0 {
                    let u = ((value - min) / span).clamp(EPSILON, 1.0 - EPSILON);
                    normal_ppf(u)
                } else {
                    0.0
                }
            }
        }
    }

    pub fn to_dict(&self) -> ParamValue {
        let family = self.distribution().fqn();
        match *self {
            Univariate::Gaussian { mean, std } => ParamValue::mapping([
                ("type", ParamValue::from(family)),
                ("fitted", ParamValue::from(true)),
                ("mean", ParamValue::from(mean)),
                ("std", ParamValue::from(std)),
            ]),
            Univariate::Uniform { min, max } => ParamValue::mapping([
                ("type", ParamValue::from(family)),
                ("fitted", ParamValue::from(true)),
                ("min", ParamValue::from(min)),
                ("max", ParamValue::from(max)),
            ]),
        }
    }

    /// Rebuild a marginal from its nested parameters.
    ///
    /// `type_hint` is used when the parameters carry no `type` entry, as is
    /// the case after a flatten/unflatten cycle.
    pub fn from_dict(params: &ParamValue, type_hint: Distribution) -> CopulaResult<Self> {
        let distribution = match params.get("type").and_then(ParamValue::as_str) {
            Some(name) => name.parse()?,
            None => type_hint,
        };
        match distribution {
            Distribution::Gaussian => Ok(Univariate::Gaussian {
                mean: params.number("mean")?,
                std: params.number("std")?,
            }),
            Distribution::Uniform => Ok(Univariate::Uniform {
                min: params.number("min")?,
                max: params.number("max")?,
            }),
        }
    }
}

/// Inverse CDF of the standard normal distribution (Acklam's rational
/// approximation, relative error below 1.2e-9).
pub fn normal_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
