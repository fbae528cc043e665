//! Compact parameter form of the Gaussian copula used for extensions.
//!
//! The covariance is symmetric, so only its lower triangle is kept, and
//! Gaussian marginals carry `ln(std)` so that a parent model of the
//! extension columns can never produce a negative spread.

use std::collections::BTreeMap;

use strata_copula::{Distribution, GaussianMultivariate, ParamValue};

use crate::errors::{ModelerError, ModelerResult};
use crate::flatten::KEY_SEPARATOR;

/// Reduce `to_dict` output of a Gaussian copula to its compact form.
pub fn compact_gaussian(params: &mut ParamValue, distribution: Distribution) {
    if let Some(ParamValue::Sequence(rows)) = params.get_mut("covariance") {
        for (position, row) in rows.iter_mut().enumerate() {
            if let ParamValue::Sequence(cells) = row {
                cells.truncate(position + 1);
            }
        }
    }

    if distribution != Distribution::Gaussian {
        return;
    }
    if let Some(ParamValue::Mapping(distribs)) = params.get_mut("distribs") {
        for marginal in distribs.values_mut() {
            if let Some(ParamValue::Number(std)) = marginal.get_mut("std") {
                *std = std.ln();
            }
        }
    }
}

/// Rebuild full Gaussian copula parameters from a flattened compact row.
///
/// `columns` names the fitted columns in order; flattening drops them.
/// Keys are looked up per column (`distribs__<column>__<param>`) rather than
/// split on the separator, since extension column names contain it too.
/// Absent covariance cells come back as `NaN`.
pub fn expand_gaussian(
    flat: &BTreeMap<String, f64>,
    columns: &[String],
    distribution: Distribution,
) -> ModelerResult<ParamValue> {
    let lower = |row: usize, col: usize| {
        flat.get(&format!("covariance{KEY_SEPARATOR}{row}{KEY_SEPARATOR}{col}"))
            .copied()
            .unwrap_or(f64::NAN)
    };
    let covariance = (0..columns.len())
        .map(|row| {
            let cells = (0..columns.len())
                .map(|col| lower(row.max(col), row.min(col)))
                .collect::<Vec<f64>>();
            ParamValue::from(cells)
        })
        .collect::<Vec<_>>();

    let marginals = columns
        .iter()
        .map(|column| {
            let marginal = marginal_params(flat, column, distribution);
            if marginal.is_empty() {
                return Err(ModelerError::Unflatten(format!(
                    "missing marginal for column '{column}'"
                )));
            }
            Ok((column.clone(), ParamValue::mapping(marginal)))
        })
        .collect::<ModelerResult<Vec<_>>>()?;

    Ok(ParamValue::mapping([
        ("type", ParamValue::from(GaussianMultivariate::TYPE_NAME)),
        ("fitted", ParamValue::from(true)),
        ("distribution", ParamValue::from(distribution.fqn())),
        (
            "columns",
            ParamValue::Sequence(
                columns
                    .iter()
                    .map(|column| ParamValue::from(column.as_str()))
                    .collect(),
            ),
        ),
        ("covariance", ParamValue::from(covariance)),
        ("distribs", ParamValue::mapping(marginals)),
    ]))
}

/// Parameters of one column's marginal, with `std` exponentiated back for
/// Gaussian marginals.
fn marginal_params(
    flat: &BTreeMap<String, f64>,
    column: &str,
    distribution: Distribution,
) -> Vec<(String, ParamValue)> {
    let prefix = format!("distribs{KEY_SEPARATOR}{column}{KEY_SEPARATOR}");
    flat.range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .filter_map(|(key, value)| {
            let param = &key[prefix.len()..];
            // longer column names sharing this prefix leave a nested remainder
            if param.is_empty() || param.contains(KEY_SEPARATOR) {
                return None;
            }
            let value = if distribution == Distribution::Gaussian && param == "std" {
                value.exp()
            } else {
                *value
            };
            Some((param.to_string(), ParamValue::from(value)))
        })
        .collect()
}
