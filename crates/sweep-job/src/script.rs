use std::fs;
use std::path::{Path, PathBuf};

use sweep_core::errors::{io_error, ErrorInfo, SweepError};
use sweep_grid::ParameterGrid;

use crate::emit::{
    ARRAY_DIRECTIVE, COMMAND_TAG, FINGERPRINT_TAG, GRID_TAG, JOB_NAME_DIRECTIVE, OUTPUT_DIR_TAG, RUNS_TAG,
};

/// Metadata recovered from an emitted array job script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptHeader {
    /// Job name from the scheduler directive.
    pub job_name: String,
    /// The grid the script was generated from.
    pub grid: ParameterGrid,
    /// Grid points per array task.
    pub runs_per_task: usize,
    /// Directory the runs write into.
    pub output_dir: PathBuf,
    /// Declared array task count.
    pub array_tasks: usize,
    /// Command template as written, shell-quoted.
    pub command: Option<String>,
}

fn header_error(code: &str, message: &str) -> SweepError {
    SweepError::InvalidSpec(ErrorInfo::new(code, message))
}

fn parse_count(code: &str, text: &str) -> Result<usize, SweepError> {
    text.trim()
        .parse()
        .map_err(|_| header_error(code, "header field is not a count").with_context("value", text))
}

/// Parses the header block of a script produced by [`crate::emit::emit`].
///
/// The embedded grid must match the embedded fingerprint, so a hand-edited
/// value list is caught before any output is attributed to the wrong point.
pub fn parse_script(text: &str) -> Result<ScriptHeader, SweepError> {
    let mut job_name = None;
    let mut grid_json = None;
    let mut fingerprint = None;
    let mut runs_per_task = None;
    let mut output_dir = None;
    let mut last_task = None;
    let mut command = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(JOB_NAME_DIRECTIVE) {
            job_name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(ARRAY_DIRECTIVE) {
            last_task = Some(parse_count("script_array", rest)?);
        } else if let Some(rest) = line.strip_prefix(GRID_TAG) {
            grid_json = Some(rest);
        } else if let Some(rest) = line.strip_prefix(FINGERPRINT_TAG) {
            fingerprint = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix(RUNS_TAG) {
            runs_per_task = Some(parse_count("script_runs", rest)?);
        } else if let Some(rest) = line.strip_prefix(COMMAND_TAG) {
            command = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix(OUTPUT_DIR_TAG) {
            output_dir = Some(PathBuf::from(rest));
        } else if !line.is_empty() && !line.starts_with('#') {
            break;
        }
    }

    let missing = |field: &str| {
        header_error("script_header", "script lacks a sweep header field")
            .with_context("field", field)
    };
    let grid = ParameterGrid::from_json(grid_json.ok_or_else(|| missing("grid"))?)?;
    let recorded = fingerprint.ok_or_else(|| missing("fingerprint"))?;
    let actual = grid.fingerprint()?;
    if recorded != actual {
        return Err(header_error(
            "script_fingerprint",
            "embedded grid does not match its fingerprint",
        )
        .with_context("recorded", recorded)
        .with_context("actual", actual));
    }
    Ok(ScriptHeader {
        job_name: job_name.ok_or_else(|| missing("job-name"))?,
        grid,
        runs_per_task: runs_per_task.ok_or_else(|| missing("runs-per-task"))?,
        output_dir: output_dir.ok_or_else(|| missing("output-dir"))?,
        array_tasks: last_task.ok_or_else(|| missing("array"))? + 1,
        command,
    })
}

/// Reads and parses an emitted script from disk.
pub fn read_job_script(path: &Path) -> Result<ScriptHeader, SweepError> {
    let text = fs::read_to_string(path).map_err(|err| io_error("script_read", path, err))?;
    parse_script(&text).map_err(|err| err.with_context("script", path.display().to_string()))
}
