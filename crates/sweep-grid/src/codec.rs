//! Mixed-radix mapping between task indices and grid points.
//!
//! Each parameter is a digit whose radix is its sequence length. The
//! last-declared parameter is the least significant digit, so consecutive
//! indices step through the last parameter first. The emitted job script
//! decodes with the same rule.

use std::fmt;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};

use crate::grid::{Combination, ParameterGrid};

/// Zero-based linear index of a grid point, as handed out by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskIndex(usize);

impl TaskIndex {
    /// Wraps a raw index.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn as_raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-parameter positions of `index`, in declaration order.
pub fn digits(index: TaskIndex, grid: &ParameterGrid) -> Result<Vec<usize>, SweepError> {
    if index.0 >= grid.size() {
        return Err(SweepError::IndexOutOfRange(
            ErrorInfo::new(
                "index_range",
                format!("task index {} is outside the grid", index.0),
            )
            .with_context("index", index.0.to_string())
            .with_context("size", grid.size().to_string()),
        ));
    }
    let mut remaining = index.0;
    let mut positions = vec![0; grid.axes().len()];
    for (slot, axis) in positions.iter_mut().zip(grid.axes()).rev() {
        *slot = remaining % axis.len();
        remaining /= axis.len();
    }
    Ok(positions)
}

/// Returns the grid point addressed by `index`.
pub fn decode(index: TaskIndex, grid: &ParameterGrid) -> Result<Combination, SweepError> {
    let positions = digits(index, grid)?;
    Ok(grid
        .axes()
        .iter()
        .zip(positions)
        .map(|(axis, position)| (axis.name().to_string(), axis.values[position].clone()))
        .collect())
}

/// Returns the task index of `combination`.
///
/// Every grid parameter must be assigned exactly once and each value must
/// exactly match one generated value of its parameter.
pub fn encode(combination: &Combination, grid: &ParameterGrid) -> Result<TaskIndex, SweepError> {
    if combination.len() != grid.axes().len() {
        return Err(SweepError::InvalidSpec(
            ErrorInfo::new(
                "combination_arity",
                "combination must assign every grid parameter exactly once",
            )
            .with_context("expected", grid.axes().len().to_string())
            .with_context("actual", combination.len().to_string()),
        ));
    }
    let mut index = 0usize;
    for axis in grid.axes() {
        let value = combination.get(axis.name()).ok_or_else(|| {
            SweepError::InvalidSpec(
                ErrorInfo::new("combination_missing", "combination lacks a grid parameter")
                    .with_context("parameter", axis.name()),
            )
        })?;
        let position = axis.position(value).ok_or_else(|| {
            SweepError::UnknownValue(
                ErrorInfo::new(
                    "value_unknown",
                    format!("value {value} is not generated for this parameter"),
                )
                .with_context("parameter", axis.name()),
            )
        })?;
        index = index * axis.len() + position;
    }
    Ok(TaskIndex(index))
}
