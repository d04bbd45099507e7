use std::fmt;

use serde::{Deserialize, Serialize};

/// A single concrete parameter value.
///
/// Range parameters always produce numbers; list parameters keep whatever the
/// declaration supplied, which on the command line is the literal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Floating point value generated by a range or declared numerically.
    Number(f64),
    /// Verbatim text value.
    Text(String),
}

/// Exact identity used to detect repeated values within one parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ValueKey {
    Number(u64),
    Text(String),
}

impl ParamValue {
    /// Returns the numeric value when this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value),
            ParamValue::Text(_) => None,
        }
    }

    pub(crate) fn key(&self) -> ValueKey {
        match self {
            // `+ 0.0` folds -0.0 onto 0.0, which compare equal.
            ParamValue::Number(value) => ValueKey::Number((value + 0.0).to_bits()),
            ParamValue::Text(text) => ValueKey::Text(text.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(value) => write!(f, "{value}"),
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_shortest_round_trip_form() {
        assert_eq!(ParamValue::from(10.0).to_string(), "10");
        assert_eq!(ParamValue::from(0.01).to_string(), "0.01");
        let third = 1.0 / 3.0;
        let rendered = ParamValue::from(third).to_string();
        assert_eq!(rendered.parse::<f64>().expect("parse"), third);
    }

    #[test]
    fn signed_zero_shares_a_key() {
        assert_eq!(ParamValue::from(0.0).key(), ParamValue::from(-0.0).key());
        assert_ne!(ParamValue::from(1.0).key(), ParamValue::from("1").key());
    }
}
