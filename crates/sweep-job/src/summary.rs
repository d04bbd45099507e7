use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sweep_core::errors::{ErrorInfo, SweepError};
use sweep_core::to_canonical_json_bytes;
use sweep_grid::ParameterGrid;

use crate::extract::LabelSet;
use crate::gather::{ResultRow, RowOutcome};
use crate::scheduler::JobId;

/// Placeholder written for rows without a value.
pub const MISSING_MARKER: &str = "NA";

const MIN_COLUMN_WIDTH: usize = 7;

/// Presentation options of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Header of the value column.
    pub value_name: String,
    /// Command line recorded in the header comment.
    pub command: Option<String>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            value_name: "value".to_string(),
            command: None,
        }
    }
}

/// Whitespace-aligned table: header comments, a column header, then one line
/// per row in the order given.
pub fn render_table(
    grid: &ParameterGrid,
    rows: &[ResultRow],
    options: &SummaryOptions,
) -> Result<String, SweepError> {
    let mut header = leading_header(grid);
    header.push(options.value_name.clone());

    let mut table = vec![header];
    for row in rows {
        let mut cells = leading_cells(row);
        cells.push(match &row.outcome {
            RowOutcome::Value(value) => value.to_string(),
            RowOutcome::Failed(_) => MISSING_MARKER.to_string(),
        });
        table.push(cells);
    }
    write_table(grid, options, &table)
}

/// Table with one column per label seen in any output, in first-seen order.
///
/// A label a row never printed, and every label of a failed row, reads as
/// [`MISSING_MARKER`]. When no output held a label the single value column
/// is kept so failed rows stay visible.
pub fn render_labels_table(
    grid: &ParameterGrid,
    rows: &[ResultRow<LabelSet>],
    options: &SummaryOptions,
) -> Result<String, SweepError> {
    let mut columns = label_columns(rows);
    if columns.is_empty() {
        columns.push(options.value_name.as_str());
    }
    let mut header = leading_header(grid);
    header.extend(columns.iter().map(|label| (*label).to_string()));

    let mut table = vec![header];
    for row in rows {
        let mut cells = leading_cells(row);
        cells.extend(columns.iter().map(|label| {
            row.value()
                .and_then(|labels| labels.get(label))
                .map_or_else(|| MISSING_MARKER.to_string(), ToString::to_string)
        }));
        table.push(cells);
    }
    write_table(grid, options, &table)
}

fn label_columns(rows: &[ResultRow<LabelSet>]) -> Vec<&str> {
    let mut columns = Vec::new();
    for labels in rows.iter().filter_map(ResultRow::value) {
        for label in labels.labels() {
            if !columns.contains(&label) {
                columns.push(label);
            }
        }
    }
    columns
}

fn leading_header(grid: &ParameterGrid) -> Vec<String> {
    let mut header = vec!["index".to_string()];
    header.extend(grid.names().into_iter().map(str::to_string));
    header
}

fn leading_cells<T>(row: &ResultRow<T>) -> Vec<String> {
    let mut cells = vec![row.index.to_string()];
    cells.extend(row.combination.iter().map(|(_, value)| value.to_string()));
    cells
}

fn write_table(
    grid: &ParameterGrid,
    options: &SummaryOptions,
    table: &[Vec<String>],
) -> Result<String, SweepError> {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let widths = (0..columns)
        .map(|col| {
            table
                .iter()
                .filter_map(|cells| cells.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(MIN_COLUMN_WIDTH)
        })
        .collect::<Vec<_>>();

    let mut out = String::new();
    if let Some(command) = &options.command {
        out.push_str(&format!("# command: {command}\n"));
    }
    out.push_str(&format!("# grid: {}\n", grid.fingerprint()?));
    for cells in table {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

/// Canonical JSON document of the summary; failures keep their detail.
pub fn render_json(
    grid: &ParameterGrid,
    rows: &[ResultRow],
    options: &SummaryOptions,
) -> Result<String, SweepError> {
    let document = json!({
        "command": options.command,
        "fingerprint": grid.fingerprint()?,
        "parameters": grid.names(),
        "rows": rows_json(rows, "value")?,
        "value_name": options.value_name,
    });
    finish_json(&document)
}

/// Canonical JSON document of an all-labels summary. Each row maps label to
/// value under `values`; `columns` lists the labels in first-seen order.
pub fn render_labels_json(
    grid: &ParameterGrid,
    rows: &[ResultRow<LabelSet>],
    options: &SummaryOptions,
) -> Result<String, SweepError> {
    let document = json!({
        "columns": label_columns(rows),
        "command": options.command,
        "fingerprint": grid.fingerprint()?,
        "parameters": grid.names(),
        "rows": rows_json(rows, "values")?,
    });
    finish_json(&document)
}

fn finish_json(document: &Value) -> Result<String, SweepError> {
    let mut bytes = to_canonical_json_bytes(document)?;
    bytes.push(b'\n');
    String::from_utf8(bytes)
        .map_err(|err| SweepError::Serde(ErrorInfo::new("summary_utf8", err.to_string())))
}

fn rows_json<T: Serialize>(rows: &[ResultRow<T>], key: &str) -> Result<Vec<Value>, SweepError> {
    rows.iter()
        .map(|row| row_json(row, key))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SweepError::Serde(ErrorInfo::new("summary_json", err.to_string())))
}

fn row_json<T: Serialize>(row: &ResultRow<T>, key: &str) -> Result<Value, serde_json::Error> {
    let mut parameters = Map::new();
    for (name, value) in row.combination.iter() {
        parameters.insert(name.to_string(), serde_json::to_value(value)?);
    }
    let mut entry = json!({
        "index": row.index,
        "parameters": parameters,
    });
    match &row.outcome {
        RowOutcome::Value(value) => entry[key] = serde_json::to_value(value)?,
        RowOutcome::Failed(failure) => {
            entry[key] = Value::Null;
            entry["failure"] = serde_json::to_value(failure)?;
        }
    }
    Ok(entry)
}

/// Keeps an existing summary intact: when `path` is taken the job id is
/// appended to the file stem, then a counter.
pub fn resolve_summary_path(path: &Path, job_id: Option<&JobId>) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "summary".to_string());
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let base = match job_id {
        Some(id) => format!("{stem}-{id}"),
        None => stem,
    };
    let mut candidate = path.with_file_name(format!("{base}{extension}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{base}-{counter}{extension}"));
        counter += 1;
    }
    candidate
}
