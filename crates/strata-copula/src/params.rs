use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CopulaError, CopulaResult};

/// Nested parameter structure produced by [`FittedModel::to_dict`].
///
/// [`FittedModel::to_dict`]: crate::FittedModel::to_dict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Sequence(Vec<ParamValue>),
    Mapping(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, ParamValue)>) -> Self {
        ParamValue::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        match self {
            ParamValue::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ParamValue> {
        match self {
            ParamValue::Mapping(entries) => entries.get_mut(key),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            ParamValue::Null => Some(f64::NAN),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a required numeric entry of a mapping.
    pub fn number(&self, key: &str) -> CopulaResult<f64> {
        self.get(key)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| CopulaError::InvalidParams(format!("missing numeric '{key}'")))
    }

    /// Look up a required text entry of a mapping.
    pub fn text(&self, key: &str) -> CopulaResult<&str> {
        self.get(key)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| CopulaError::InvalidParams(format!("missing text '{key}'")))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::Sequence(values.into_iter().map(ParamValue::Number).collect())
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(values: Vec<ParamValue>) -> Self {
        ParamValue::Sequence(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_follow_variant() {
        let params = ParamValue::mapping([
            ("mean", ParamValue::from(1.5)),
            ("type", ParamValue::from("gaussian")),
        ]);
        assert_eq!(params.number("mean").unwrap(), 1.5);
        assert_eq!(params.text("type").unwrap(), "gaussian");
        assert!(params.number("type").is_err());
        assert!(ParamValue::from(1.0).get("mean").is_none());
    }

    #[test]
    fn deserializes_nested_json() {
        let params: ParamValue =
            serde_json::from_str(r#"{"a": [[1, 0], [0, 1]], "b": {"c": true, "d": "x"}}"#)
                .expect("parse params");
        let rows = params.get("a").and_then(ParamValue::as_sequence).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(params.get("b").and_then(|b| b.get("c")), Some(&ParamValue::Bool(true)));
    }
}
