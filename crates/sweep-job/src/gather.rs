use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweep_core::errors::SweepError;
use sweep_grid::{Combination, ParameterGrid, TaskIndex};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::{DataValue, Extract, ExtractionError, LabelSet};

/// Resolves the output artifact of a task.
pub trait OutputLocator {
    /// Path of the artifact written for `index`.
    fn locate(&self, index: TaskIndex) -> PathBuf;
}

impl<F> OutputLocator for F
where
    F: Fn(TaskIndex) -> PathBuf,
{
    fn locate(&self, index: TaskIndex) -> PathBuf {
        self(index)
    }
}

/// Why a row carries no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskFailure {
    /// The task never wrote its artifact.
    #[error("missing output {}", path.display())]
    MissingOutput {
        /// Expected artifact path.
        path: PathBuf,
    },
    /// The artifact exists but could not be read.
    #[error("unreadable output {}: {reason}", path.display())]
    Unreadable {
        /// Artifact path.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },
    /// The artifact holds no value the extraction rule accepts.
    #[error("no value in {}: {reason}", path.display())]
    Extraction {
        /// Artifact path.
        path: PathBuf,
        /// Extraction error text.
        reason: String,
    },
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome<T = DataValue> {
    /// The extracted value.
    Value(T),
    /// The point produced nothing usable.
    Failed(TaskFailure),
}

/// One line of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow<T = DataValue> {
    /// Task index of the point.
    pub index: TaskIndex,
    /// Decoded parameter values.
    pub combination: Combination,
    /// Value or failure marker.
    pub outcome: RowOutcome<T>,
}

impl<T> ResultRow<T> {
    /// The extracted value, if any.
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            RowOutcome::Value(value) => Some(value),
            RowOutcome::Failed(_) => None,
        }
    }
}

/// Collects one row per grid point, in task index order.
///
/// Per-task problems never abort the walk; they are recorded on the row.
pub fn gather<L, E>(
    grid: &ParameterGrid,
    locator: &L,
    extractor: &E,
) -> Result<Vec<ResultRow>, SweepError>
where
    L: OutputLocator + ?Sized,
    E: Extract + ?Sized,
{
    collect_rows(grid, locator, |text| extractor.extract(text))
}

/// Collects every labelled value of every grid point, in task index order.
///
/// Each distinct label becomes a summary column. An output without any
/// labelled pair is recorded as an extraction failure on its row.
pub fn gather_labels<L>(
    grid: &ParameterGrid,
    locator: &L,
) -> Result<Vec<ResultRow<LabelSet>>, SweepError>
where
    L: OutputLocator + ?Sized,
{
    collect_rows(grid, locator, |text| {
        let labels = LabelSet::parse(text);
        if labels.is_empty() {
            Err(ExtractionError("no labelled values in output".into()))
        } else {
            Ok(labels)
        }
    })
}

fn collect_rows<L, T, F>(
    grid: &ParameterGrid,
    locator: &L,
    extract: F,
) -> Result<Vec<ResultRow<T>>, SweepError>
where
    L: OutputLocator + ?Sized,
    F: Fn(&str) -> Result<T, ExtractionError>,
{
    let mut rows = Vec::with_capacity(grid.size());
    let mut failed = 0usize;
    for index in grid.indices() {
        let combination = grid.decode(index)?;
        let path = locator.locate(index);
        let outcome = match read_value(&path, &extract) {
            Ok(value) => RowOutcome::Value(value),
            Err(failure) => {
                warn!(%index, %combination, %failure, "task produced no value");
                failed += 1;
                RowOutcome::Failed(failure)
            }
        };
        rows.push(ResultRow {
            index,
            combination,
            outcome,
        });
    }
    debug!(rows = rows.len(), failed, "gathered task outputs");
    Ok(rows)
}

fn read_value<T, F>(path: &Path, extract: &F) -> Result<T, TaskFailure>
where
    F: Fn(&str) -> Result<T, ExtractionError>,
{
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => TaskFailure::MissingOutput {
            path: path.to_path_buf(),
        },
        _ => TaskFailure::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    })?;
    extract(&String::from_utf8_lossy(&bytes)).map_err(|err| TaskFailure::Extraction {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
