use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};
use sweep_core::{from_json_slice, stable_hash_string, to_canonical_json_bytes};

use crate::codec::{self, TaskIndex};
use crate::spec::ParameterSpec;
use crate::value::ParamValue;

/// A declared parameter together with its materialized value sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// The declaration the values were generated from.
    pub spec: ParameterSpec,
    /// Values in generation order.
    pub values: Vec<ParamValue>,
}

impl Axis {
    /// Parameter name of the axis.
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Number of values along the axis; the radix of its index digit.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the axis has no values (never the case for built grids).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of an exactly matching value.
    pub fn position(&self, value: &ParamValue) -> Option<usize> {
        let key = value.key();
        self.values.iter().position(|candidate| candidate.key() == key)
    }
}

/// The ordered Cartesian product of all declared parameters.
///
/// Immutable once built; rebuilding from a new declaration yields a new grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridDocument", into = "GridDocument")]
pub struct ParameterGrid {
    axes: Vec<Axis>,
    size: usize,
}

#[derive(Serialize, Deserialize)]
struct GridDocument {
    axes: Vec<Axis>,
}

impl TryFrom<GridDocument> for ParameterGrid {
    type Error = SweepError;

    fn try_from(document: GridDocument) -> Result<Self, Self::Error> {
        ParameterGrid::from_axes(document.axes)
    }
}

impl From<ParameterGrid> for GridDocument {
    fn from(grid: ParameterGrid) -> Self {
        GridDocument { axes: grid.axes }
    }
}

impl ParameterGrid {
    /// Assembles a grid from materialized axes.
    ///
    /// Checks each declaration, name uniqueness, that every axis is non-empty
    /// and free of repeated values, and that the product of lengths fits in
    /// `usize`. The values themselves are taken as given, so a grid read back
    /// from JSON decodes exactly as the one that was written.
    pub fn from_axes(axes: Vec<Axis>) -> Result<Self, SweepError> {
        let mut names = BTreeSet::new();
        let mut size: usize = 1;
        for axis in &axes {
            axis.spec.validate()?;
            if !names.insert(axis.name()) {
                return Err(SweepError::InvalidSpec(
                    ErrorInfo::new("parameter_duplicate", "parameter declared more than once")
                        .with_context("parameter", axis.name()),
                ));
            }
            if axis.is_empty() {
                return Err(SweepError::InvalidSpec(
                    ErrorInfo::new("axis_empty", "parameter has no values")
                        .with_context("parameter", axis.name()),
                ));
            }
            check_values(axis)?;
            size = size.checked_mul(axis.len()).ok_or_else(|| {
                SweepError::GridTooLarge(
                    ErrorInfo::new("grid_overflow", "grid size overflows the index type")
                        .with_context("parameter", axis.name()),
                )
            })?;
        }
        Ok(Self { axes, size })
    }

    /// Axes in declaration order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Looks up an axis by parameter name.
    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name() == name)
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.axes.iter().map(Axis::name).collect()
    }

    /// Per-parameter radices in declaration order.
    pub fn radices(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::len).collect()
    }

    /// Number of grid points (always at least one).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Every task index of the grid, in order.
    pub fn indices(&self) -> impl Iterator<Item = TaskIndex> {
        (0..self.size).map(TaskIndex::from_raw)
    }

    /// See [`codec::decode`].
    pub fn decode(&self, index: TaskIndex) -> Result<Combination, SweepError> {
        codec::decode(index, self)
    }

    /// See [`codec::encode`].
    pub fn encode(&self, combination: &Combination) -> Result<TaskIndex, SweepError> {
        codec::encode(combination, self)
    }

    /// Stable SHA256 fingerprint of the grid contents.
    pub fn fingerprint(&self) -> Result<String, SweepError> {
        stable_hash_string(self)
    }

    /// Canonical single-line JSON form, suitable for embedding in scripts.
    pub fn to_canonical_json(&self) -> Result<String, SweepError> {
        let bytes = to_canonical_json_bytes(self)?;
        String::from_utf8(bytes)
            .map_err(|err| SweepError::Serde(ErrorInfo::new("grid_utf8", err.to_string())))
    }

    /// Parses a grid previously written by [`ParameterGrid::to_canonical_json`].
    pub fn from_json(text: &str) -> Result<Self, SweepError> {
        from_json_slice(text.as_bytes())
    }
}

fn check_values(axis: &Axis) -> Result<(), SweepError> {
    let mut seen = BTreeSet::new();
    for value in &axis.values {
        if value.as_f64().is_some_and(|number| !number.is_finite()) {
            return Err(SweepError::InvalidSpec(
                ErrorInfo::new("range_overflow", format!("value {value} is not finite"))
                    .with_context("parameter", axis.name())
                    .with_hint("narrow the range so every point fits a 64-bit float"),
            ));
        }
        if !seen.insert(value.key()) {
            return Err(SweepError::InvalidSpec(
                ErrorInfo::new("value_duplicate", format!("value {value} appears twice"))
                    .with_context("parameter", axis.name()),
            ));
        }
    }
    Ok(())
}

/// One point of the grid: a value for every parameter, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Combination {
    entries: Vec<(String, ParamValue)>,
}

impl Combination {
    /// Creates a combination from ordered `(name, value)` pairs.
    pub fn new(entries: Vec<(String, ParamValue)>) -> Self {
        Self { entries }
    }

    /// Value assigned to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    /// Iterates `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of assigned parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for the combination of a parameterless grid.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for Combination {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
