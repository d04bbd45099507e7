use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};

use crate::value::ParamValue;

fn spec_error(code: &str, name: &str, message: impl Into<String>) -> SweepError {
    SweepError::InvalidSpec(ErrorInfo::new(code, message).with_context("parameter", name))
}

fn declaration_error(code: &str, declaration: &str, message: &str) -> SweepError {
    SweepError::InvalidSpec(
        ErrorInfo::new(code, message).with_context("declaration", declaration),
    )
}

/// One declared parameter of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Identifier used for flags, shell arrays and summary columns.
    pub name: String,
    /// How the value sequence is generated.
    #[serde(flatten)]
    pub kind: ParameterKind,
}

/// Generation rule for a parameter's value sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Explicit values, used in the given order.
    List { values: Vec<ParamValue> },
    /// `count` evenly spaced values from `start` to `stop` inclusive.
    #[serde(alias = "linspace")]
    LinearRange { start: f64, stop: f64, count: usize },
    /// `count` values `10^x` with `x` evenly spaced over `[start, stop]`.
    ///
    /// `start` and `stop` are exponents, not raw values.
    #[serde(alias = "logspace")]
    LogRange { start: f64, stop: f64, count: usize },
}

impl ParameterSpec {
    /// Declares an explicit list parameter.
    pub fn list<V: Into<ParamValue>>(name: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::List {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Declares a linearly spaced parameter.
    pub fn linear_range(name: impl Into<String>, start: f64, stop: f64, count: usize) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::LinearRange { start, stop, count },
        }
    }

    /// Declares a log-spaced parameter with exponent bounds.
    pub fn log_range(name: impl Into<String>, start: f64, stop: f64, count: usize) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::LogRange { start, stop, count },
        }
    }

    /// Parses a `NAME,START,STOP,COUNT` linear range declaration.
    pub fn parse_linspace(declaration: &str) -> Result<Self, SweepError> {
        let (name, start, stop, count) = parse_range(declaration)?;
        Ok(Self::linear_range(name, start, stop, count))
    }

    /// Parses a `NAME,START,STOP,COUNT` log range declaration (exponent bounds).
    pub fn parse_logspace(declaration: &str) -> Result<Self, SweepError> {
        let (name, start, stop, count) = parse_range(declaration)?;
        Ok(Self::log_range(name, start, stop, count))
    }

    /// Parses a `NAME,VAL1[,VAL2,...]` explicit list declaration.
    ///
    /// Values are kept verbatim as text.
    pub fn parse_list(declaration: &str) -> Result<Self, SweepError> {
        let mut tokens = declaration.split(',');
        let name = tokens.next().unwrap_or_default().trim();
        let values: Vec<ParamValue> = tokens.map(|token| ParamValue::from(token.trim())).collect();
        if name.is_empty() || values.is_empty() {
            return Err(declaration_error(
                "declaration_format",
                declaration,
                "list declaration must be NAME,VAL1[,VAL2,...]",
            ));
        }
        Ok(Self {
            name: name.to_string(),
            kind: ParameterKind::List { values },
        })
    }

    /// Number of values the declaration generates.
    pub fn value_count(&self) -> usize {
        match &self.kind {
            ParameterKind::List { values } => values.len(),
            ParameterKind::LinearRange { count, .. } | ParameterKind::LogRange { count, .. } => {
                *count
            }
        }
    }

    /// Checks the declaration in isolation (name syntax and kind data).
    pub fn validate(&self) -> Result<(), SweepError> {
        validate_name(&self.name)?;
        match &self.kind {
            ParameterKind::List { values } => {
                if values.is_empty() {
                    return Err(spec_error(
                        "list_empty",
                        &self.name,
                        "list parameter declares no values",
                    ));
                }
                Ok(())
            }
            ParameterKind::LinearRange { start, stop, count }
            | ParameterKind::LogRange { start, stop, count } => {
                validate_range(&self.name, *start, *stop, *count)
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), SweepError> {
    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SweepError::InvalidSpec(
            ErrorInfo::new("parameter_name", format!("invalid parameter name '{name}'"))
                .with_context("parameter", name)
                .with_hint("names must match [A-Za-z_][A-Za-z0-9_]*"),
        ));
    }
    Ok(())
}

fn validate_range(name: &str, start: f64, stop: f64, count: usize) -> Result<(), SweepError> {
    if !start.is_finite() || !stop.is_finite() {
        return Err(spec_error(
            "range_bounds",
            name,
            "range bounds must be finite",
        ));
    }
    if count < 1 {
        return Err(spec_error("range_count", name, "range count must be at least 1"));
    }
    if start > stop {
        return Err(spec_error(
            "range_order",
            name,
            format!("range start {start} exceeds stop {stop}"),
        ));
    }
    if count > 1 && start == stop {
        return Err(spec_error(
            "range_span",
            name,
            format!("range of {count} points needs start != stop"),
        ));
    }
    Ok(())
}

fn parse_range(declaration: &str) -> Result<(String, f64, f64, usize), SweepError> {
    let tokens: Vec<&str> = declaration.split(',').map(str::trim).collect();
    let [name, start, stop, count] = tokens.as_slice() else {
        return Err(declaration_error(
            "declaration_format",
            declaration,
            "range declaration must be NAME,START,STOP,COUNT",
        ));
    };
    let numbers = start
        .parse::<f64>()
        .ok()
        .zip(stop.parse::<f64>().ok())
        .zip(count.parse::<usize>().ok());
    let Some(((start, stop), count)) = numbers else {
        return Err(declaration_error(
            "declaration_number",
            declaration,
            "START and STOP must be floats and COUNT a non-negative integer",
        ));
    };
    Ok((name.to_string(), start, stop, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_shell_identifier_rules() {
        assert!(validate_name("learning_rate").is_ok());
        assert!(validate_name("_x1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1x").is_err());
        assert!(validate_name("foo-bar").is_err());
    }

    #[test]
    fn single_point_range_may_collapse() {
        assert!(validate_range("x", 2.0, 2.0, 1).is_ok());
        assert!(validate_range("x", 2.0, 2.0, 2).is_err());
    }
}
