use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};
use tracing::debug;

use crate::grid::{Axis, ParameterGrid};
use crate::spec::{ParameterKind, ParameterSpec};
use crate::value::ParamValue;

/// Safety limits applied while building a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    /// Largest accepted number of grid points.
    #[serde(default = "GridLimits::default_max_size")]
    pub max_size: usize,
}

impl GridLimits {
    const fn default_max_size() -> usize {
        10_000
    }
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_size: Self::default_max_size(),
        }
    }
}

/// Expands ordered parameter declarations into a grid.
///
/// Fails with [`SweepError::InvalidSpec`] for malformed or duplicate
/// declarations, or for sequences that repeat a value (which would make the
/// index encoding ambiguous), and with [`SweepError::GridTooLarge`] when the
/// product of sequence lengths exceeds `limits.max_size`.
pub fn build(specs: &[ParameterSpec], limits: &GridLimits) -> Result<ParameterGrid, SweepError> {
    let mut names = BTreeSet::new();
    let mut axes = Vec::with_capacity(specs.len());
    for spec in specs {
        spec.validate()?;
        if !names.insert(spec.name.as_str()) {
            return Err(SweepError::InvalidSpec(
                ErrorInfo::new("parameter_duplicate", "parameter declared more than once")
                    .with_context("parameter", spec.name.as_str()),
            ));
        }
        // A single axis longer than the limit already rules the grid out.
        let count = spec.value_count();
        if count > limits.max_size {
            return Err(SweepError::GridTooLarge(
                too_large(count, limits).with_context("parameter", spec.name.as_str()),
            ));
        }
        axes.push(Axis {
            spec: spec.clone(),
            values: materialize(&spec.kind),
        });
    }
    let grid = ParameterGrid::from_axes(axes)?;
    if grid.size() > limits.max_size {
        return Err(SweepError::GridTooLarge(too_large(grid.size(), limits)));
    }
    debug!(
        parameters = grid.axes().len(),
        size = grid.size(),
        "built parameter grid"
    );
    Ok(grid)
}

fn materialize(kind: &ParameterKind) -> Vec<ParamValue> {
    match kind {
        ParameterKind::List { values } => values.clone(),
        ParameterKind::LinearRange { start, stop, count } => linspace(*start, *stop, *count)
            .into_iter()
            .map(ParamValue::Number)
            .collect(),
        ParameterKind::LogRange { start, stop, count } => logspace(*start, *stop, *count)
            .into_iter()
            .map(ParamValue::Number)
            .collect(),
    }
}

fn too_large(size: usize, limits: &GridLimits) -> ErrorInfo {
    ErrorInfo::new("grid_limit", format!("grid has {size} points"))
        .with_context("size", size.to_string())
        .with_context("limit", limits.max_size.to_string())
        .with_hint("raise limits.max_grid_size or narrow the declarations")
}

/// `count` evenly spaced points over `[start, stop]`.
///
/// A single point is exactly `start`; otherwise both ends are included and the
/// last point is pinned to `stop`.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = count - 1;
            let step = (stop - start) / last as f64;
            (0..count)
                .map(|i| if i == last { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// `10^x` for `x` in `linspace(start, stop, count)`.
pub fn logspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    linspace(start, stop, count)
        .into_iter()
        .map(|exponent| 10f64.powf(exponent))
        .collect()
}
