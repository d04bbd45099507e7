//! Structured error types shared across sweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (parameter names, job ids, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for sweep construction, submission and collation.
///
/// Every variant is fatal for the operation that raised it. Failures of
/// individual array tasks are not errors at this level; the gatherer records
/// them inline on the affected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// A parameter declaration or combination is malformed.
    #[error("invalid parameter spec: {0}")]
    InvalidSpec(ErrorInfo),
    /// The grid exceeds the configured size limit.
    #[error("grid too large: {0}")]
    GridTooLarge(ErrorInfo),
    /// A task index lies outside the grid.
    #[error("task index out of range: {0}")]
    IndexOutOfRange(ErrorInfo),
    /// A combination carries a value that the grid never generated.
    #[error("unknown parameter value: {0}")]
    UnknownValue(ErrorInfo),
    /// The scheduler rejected a submission or could not be reached.
    #[error("submission error: {0}")]
    Submission(ErrorInfo),
    /// Configuration could not be loaded or is inconsistent.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Filesystem errors.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::InvalidSpec(info)
            | SweepError::GridTooLarge(info)
            | SweepError::IndexOutOfRange(info)
            | SweepError::UnknownValue(info)
            | SweepError::Submission(info)
            | SweepError::Config(info)
            | SweepError::Io(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// Returns the stable error code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Adds a context entry to the payload, keeping the error family.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            SweepError::InvalidSpec(info) => SweepError::InvalidSpec(info.with_context(key, value)),
            SweepError::GridTooLarge(info) => {
                SweepError::GridTooLarge(info.with_context(key, value))
            }
            SweepError::IndexOutOfRange(info) => {
                SweepError::IndexOutOfRange(info.with_context(key, value))
            }
            SweepError::UnknownValue(info) => {
                SweepError::UnknownValue(info.with_context(key, value))
            }
            SweepError::Submission(info) => SweepError::Submission(info.with_context(key, value)),
            SweepError::Config(info) => SweepError::Config(info.with_context(key, value)),
            SweepError::Io(info) => SweepError::Io(info.with_context(key, value)),
            SweepError::Serde(info) => SweepError::Serde(info.with_context(key, value)),
        }
    }
}

/// Wraps a filesystem failure, recording the offending path as context.
pub fn io_error(code: &str, path: &Path, err: impl ToString) -> SweepError {
    SweepError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}
