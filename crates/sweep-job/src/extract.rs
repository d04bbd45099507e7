use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use sweep_core::errors::{ErrorInfo, SweepError};
use thiserror::Error;

/// A value pulled out of a task's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Anything else, surrounding quotes removed.
    Text(String),
}

impl DataValue {
    /// Interprets a token as an integer, then a float, then text.
    pub fn parse(token: &str) -> Self {
        let token = strip_quotes(token.trim());
        if let Ok(value) = token.parse::<i64>() {
            return DataValue::Int(value);
        }
        match token.parse::<f64>() {
            Ok(value) if looks_numeric(token) => DataValue::Float(value),
            _ => DataValue::Text(token.to_string()),
        }
    }
}

// `f64::from_str` also accepts words such as "inf" and "NaN".
fn looks_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

fn strip_quotes(token: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Int(value) => write!(f, "{value}"),
            DataValue::Float(value) => write!(f, "{value}"),
            DataValue::Text(text) => f.write_str(text),
        }
    }
}

/// Why no value could be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExtractionError(pub String);

/// Pulls the designated value out of one task's output text.
pub trait Extract {
    /// Extracts the value from `text`.
    fn extract(&self, text: &str) -> Result<DataValue, ExtractionError>;
}

/// Built-in extraction rules. Lines starting with `#` are never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum ExtractionRule {
    /// Last numeric token on the last non-comment line that has one.
    #[default]
    LastNumber,
    /// Value of the last `label value` or `label=value` pair.
    Labelled {
        /// Label preceding the value.
        label: String,
    },
    /// Whitespace separated field `field` (0-based) of non-comment line
    /// `line` (0-based; negative counts from the end).
    Field {
        /// Line selector.
        line: i64,
        /// Field selector.
        field: usize,
    },
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d*\.\d+|\d+\.?)(?:[Ee][+-]?\d+)?").expect("static number pattern")
    })
}

fn data_lines(text: &str) -> impl DoubleEndedIterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

impl Extract for ExtractionRule {
    fn extract(&self, text: &str) -> Result<DataValue, ExtractionError> {
        match self {
            ExtractionRule::LastNumber => data_lines(text)
                .rev()
                .find_map(|line| number_pattern().find_iter(line).last())
                .map(|token| DataValue::parse(token.as_str()))
                .ok_or_else(|| ExtractionError("no numeric value in output".into())),
            ExtractionRule::Labelled { label } => data_lines(text)
                .rev()
                .find_map(|line| labelled_value(line, label))
                .map(DataValue::parse)
                .ok_or_else(|| ExtractionError(format!("no value labelled '{label}'"))),
            ExtractionRule::Field { line, field } => {
                let lines = data_lines(text).collect::<Vec<_>>();
                let position = if *line < 0 {
                    usize::try_from(line.unsigned_abs())
                        .ok()
                        .and_then(|back| lines.len().checked_sub(back))
                } else {
                    usize::try_from(*line).ok()
                };
                let selected = position
                    .and_then(|pos| lines.get(pos))
                    .ok_or_else(|| ExtractionError(format!("output has no line {line}")))?;
                selected
                    .split_whitespace()
                    .nth(*field)
                    .map(DataValue::parse)
                    .ok_or_else(|| {
                        ExtractionError(format!("line {line} has no field {field}"))
                    })
            }
        }
    }
}

fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    let mut found = None;
    for (pos, &token) in tokens.iter().enumerate() {
        let value = if let Some(rest) = token
            .strip_prefix(label)
            .and_then(|rest| rest.strip_prefix('='))
        {
            if rest.is_empty() {
                tokens.get(pos + 1).copied()
            } else {
                Some(rest)
            }
        } else if token == label {
            match tokens.get(pos + 1).copied() {
                Some("=") => tokens.get(pos + 2).copied(),
                Some(next) => Some(next.strip_prefix('=').unwrap_or(next)),
                None => None,
            }
        } else {
            None
        };
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            found = Some(value);
        }
    }
    found
}

/// Every labelled value of one output, labels in first-seen order.
///
/// Serializes as a map from label to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelSet {
    entries: Vec<(String, DataValue)>,
}

impl LabelSet {
    /// Collects the `label value`, `label=value` and `label = value` pairs of
    /// every non-comment line. A repeated label keeps its first position and
    /// its last value; a word with more than one `=` is skipped.
    pub fn parse(text: &str) -> Self {
        let mut set = Self::default();
        for line in data_lines(text) {
            for (label, value) in line_pairs(line) {
                set.insert(label, DataValue::parse(value));
            }
        }
        set
    }

    /// Sets `label`, replacing an earlier value in place.
    pub fn insert(&mut self, label: &str, value: DataValue) {
        match self.entries.iter_mut().find(|(name, _)| name == label) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((label.to_string(), value)),
        }
    }

    /// Value recorded for `label`.
    pub fn get(&self, label: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    /// Labels in first-seen order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no pair was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(name, value)| (name, value)))
    }
}

fn line_pairs(line: &str) -> Vec<(&str, &str)> {
    let words = line.split_whitespace().collect::<Vec<_>>();
    let mut pairs = Vec::new();
    let mut pos = 0;
    while pos < words.len() {
        let word = words[pos];
        let (label, value, width) = match word.split_once('=') {
            None => match words.get(pos + 1).copied() {
                Some("=") => (word, words.get(pos + 2).copied(), 3),
                next => (word, next, 2),
            },
            Some((label, "")) => (label, words.get(pos + 1).copied(), 2),
            Some((label, value)) => (label, Some(value), 1),
        };
        pos += width;
        if let Some(value) = value.filter(|value| !label.is_empty() && !value.contains('=')) {
            pairs.push((label, value));
        }
    }
    pairs
}

impl fmt::Display for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionRule::LastNumber => f.write_str("last-number"),
            ExtractionRule::Labelled { label } => write!(f, "labelled:{label}"),
            ExtractionRule::Field { line, field } => write!(f, "field:{line}:{field}"),
        }
    }
}

impl FromStr for ExtractionRule {
    type Err = SweepError;

    /// Accepts `last-number`, `labelled:LABEL` and `field:LINE:FIELD`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            SweepError::Config(
                ErrorInfo::new("extraction_rule", format!("unknown extraction rule '{text}'"))
                    .with_hint("use last-number, labelled:LABEL or field:LINE:FIELD"),
            )
        };
        let mut parts = text.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("last-number"), None, None) => Ok(ExtractionRule::LastNumber),
            (Some("labelled"), Some(label), None) if !label.is_empty() => {
                Ok(ExtractionRule::Labelled {
                    label: label.to_string(),
                })
            }
            (Some("field"), Some(line), Some(field)) => Ok(ExtractionRule::Field {
                line: line.trim().parse().map_err(|_| invalid())?,
                field: field.trim().parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}
