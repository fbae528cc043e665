use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A raw (untransformed) cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a textual cell, preferring integers, then floats, then booleans.
    ///
    /// Empty cells become [`Value::Null`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Value::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Value::Float(value);
        }
        match trimmed {
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Float(value) if value.is_nan())
    }

    /// Identity key used when grouping or joining on key columns.
    ///
    /// Returns `None` for missing values, which never match anything.
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Float(value) if value.is_nan() => None,
            Value::Bool(value) => Some(value.to_string()),
            Value::Int(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::Text(value) => Some(value.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(Value::parse("42"), Value::Int(42));
        assert_eq!(Value::parse("4.5"), Value::Float(4.5));
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("A"), Value::Text("A".to_string()));
    }

    #[test]
    fn parse_trims_text_so_keys_match() {
        assert_eq!(Value::parse(" A "), Value::Text("A".to_string()));
        assert_eq!(Value::parse(" A").key(), Value::parse("A").key());
    }

    #[test]
    fn missing_values_have_no_key() {
        assert_eq!(Value::Null.key(), None);
        assert_eq!(Value::Float(f64::NAN).key(), None);
        assert_eq!(Value::Int(7).key(), Some("7".to_string()));
    }
}
