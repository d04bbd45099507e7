use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweep_core::errors::{io_error, ErrorInfo, SweepError};
use sweep_grid::ParameterGrid;
use tracing::info;

use crate::layout::array_log_pattern;
use crate::shell;
use crate::template::{CommandTemplate, Segment};

pub(crate) const FINGERPRINT_TAG: &str = "# sweep-grid-fingerprint: ";
pub(crate) const GRID_TAG: &str = "# sweep-grid: ";
pub(crate) const RUNS_TAG: &str = "# sweep-runs-per-task: ";
pub(crate) const OUTPUT_DIR_TAG: &str = "# sweep-output-dir: ";
pub(crate) const COMMAND_TAG: &str = "# sweep-command: ";
pub(crate) const JOB_NAME_DIRECTIVE: &str = "#SBATCH --job-name=";
pub(crate) const ARRAY_DIRECTIVE: &str = "#SBATCH --array=0-";

/// Knobs of the emitted array job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitOptions {
    /// Scheduler job name, also the prefix of every output file.
    pub job_name: String,
    /// Directory receiving the per-run output artifacts.
    pub output_dir: PathBuf,
    /// Grid points executed sequentially by one array task.
    pub runs_per_task: usize,
    /// Directory for scheduler stdout/stderr logs; defaults to `output_dir`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl EmitOptions {
    /// Options with one run per task and logs next to the outputs.
    pub fn new(job_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_name: job_name.into(),
            output_dir: output_dir.into(),
            runs_per_task: 1,
            log_dir: None,
        }
    }

    /// Number of array tasks needed to cover `grid_size` points.
    pub fn array_tasks(&self, grid_size: usize) -> usize {
        grid_size.div_ceil(self.runs_per_task.max(1))
    }

    fn validate(&self) -> Result<(), SweepError> {
        validate_job_name(&self.job_name)?;
        if self.runs_per_task == 0 {
            return Err(SweepError::Config(
                ErrorInfo::new("runs_per_task", "runs per task must be at least 1")
                    .with_hint("set job.runs_per_task to a positive integer"),
            ));
        }
        script_path_text(&self.output_dir)?;
        if let Some(log_dir) = &self.log_dir {
            script_path_text(log_dir)?;
        }
        Ok(())
    }

    fn log_dir(&self) -> &Path {
        self.log_dir.as_deref().unwrap_or(&self.output_dir)
    }
}

/// A job ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Scheduler job name.
    pub name: String,
    /// Complete script text.
    pub script: String,
    /// Array task count, `None` for a single job.
    pub array_tasks: Option<usize>,
    /// Scheduler stdout path or pattern.
    pub log: Option<PathBuf>,
}

impl JobDescriptor {
    /// Single (non-array) job running one shell command line.
    pub fn wrap(name: impl Into<String>, command_line: &str, log: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: format!("#!/bin/bash\n{command_line}\n"),
            array_tasks: None,
            log,
        }
    }

    /// Writes the script to `path` and marks it executable.
    pub fn write_to(&self, path: &Path) -> Result<(), SweepError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| io_error("script_dir", parent, err))?;
        }
        fs::write(path, &self.script).map_err(|err| io_error("script_write", path, err))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755))
                .map_err(|err| io_error("script_mode", path, err))?;
        }
        Ok(())
    }
}

/// Job names end up in file names and scheduler directives.
pub(crate) fn validate_job_name(name: &str) -> Result<(), SweepError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(SweepError::Config(
            ErrorInfo::new("job_name", "job name may only hold [A-Za-z0-9._-]")
                .with_context("job_name", name),
        ))
    }
}

fn script_path_text(path: &Path) -> Result<&str, SweepError> {
    match path.to_str() {
        Some(text) if !text.is_empty() && !text.contains('\n') => Ok(text),
        _ => Err(SweepError::Config(
            ErrorInfo::new("path_text", "directory must be a non-empty single-line UTF-8 path")
                .with_context("path", path.display().to_string()),
        )),
    }
}

/// Renders the array job script for `grid`.
///
/// The script takes its task index as the first positional argument, falling
/// back to `SLURM_ARRAY_TASK_ID`, decodes every run index it owns with the
/// last-declared parameter as the fastest digit, and writes each run to
/// `<output_dir>/<job>-<array job id>-r<index>.out`.
pub fn emit(
    grid: &ParameterGrid,
    template: &CommandTemplate,
    options: &EmitOptions,
) -> Result<JobDescriptor, SweepError> {
    options.validate()?;
    template.check(grid)?;

    let size = grid.size();
    let tasks = options.array_tasks(size);
    let output_dir = script_path_text(&options.output_dir)?;
    let log_dir = options.log_dir();
    let grid_json = grid.to_canonical_json()?;
    let fingerprint = grid.fingerprint()?;

    let mut script = String::new();
    write_script(
        &mut script,
        &ScriptParts {
            grid,
            template,
            options,
            tasks,
            output_dir,
            log_dir,
            grid_json: &grid_json,
            fingerprint: &fingerprint,
        },
    )
    .map_err(|err| SweepError::Serde(ErrorInfo::new("script_render", err.to_string())))?;

    info!(
        job = %options.job_name,
        size,
        tasks,
        runs_per_task = options.runs_per_task,
        "emitted array job script"
    );
    Ok(JobDescriptor {
        name: options.job_name.clone(),
        script,
        array_tasks: Some(tasks),
        log: Some(log_dir.join(array_log_pattern("out"))),
    })
}

struct ScriptParts<'a> {
    grid: &'a ParameterGrid,
    template: &'a CommandTemplate,
    options: &'a EmitOptions,
    tasks: usize,
    output_dir: &'a str,
    log_dir: &'a Path,
    grid_json: &'a str,
    fingerprint: &'a str,
}

fn write_script(out: &mut String, parts: &ScriptParts<'_>) -> std::fmt::Result {
    let grid = parts.grid;
    let options = parts.options;

    writeln!(out, "#!/bin/bash")?;
    writeln!(out, "{JOB_NAME_DIRECTIVE}{}", options.job_name)?;
    writeln!(out, "{ARRAY_DIRECTIVE}{}", parts.tasks.saturating_sub(1))?;
    writeln!(
        out,
        "#SBATCH --output={}",
        parts.log_dir.join(array_log_pattern("out")).display()
    )?;
    writeln!(
        out,
        "#SBATCH --error={}",
        parts.log_dir.join(array_log_pattern("err")).display()
    )?;
    writeln!(out, "{FINGERPRINT_TAG}{}", parts.fingerprint)?;
    writeln!(out, "{RUNS_TAG}{}", options.runs_per_task)?;
    writeln!(out, "{OUTPUT_DIR_TAG}{}", parts.output_dir)?;
    writeln!(out, "{COMMAND_TAG}{}", parts.template.display())?;
    writeln!(out, "{GRID_TAG}{}", parts.grid_json)?;
    writeln!(out)?;
    writeln!(out, "set -u")?;
    writeln!(out)?;

    for axis in grid.axes() {
        let values = axis
            .values
            .iter()
            .map(|value| shell::quote(&value.to_string()))
            .collect::<Vec<_>>();
        writeln!(out, "p_{}=({})", axis.name(), values.join(" "))?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "task_id=\"${{1:-${{SLURM_ARRAY_TASK_ID:?task index required}}}}\""
    )?;
    writeln!(out, "array_job_id=\"${{SLURM_ARRAY_JOB_ID:-local}}\"")?;
    writeln!(out, "job_name={}", shell::quote(&options.job_name))?;
    writeln!(out, "outdir={}", shell::quote(parts.output_dir))?;
    writeln!(out, "runs_per_task={}", options.runs_per_task)?;
    writeln!(out, "grid_size={}", grid.size())?;
    writeln!(out)?;
    writeln!(out, "if ! [[ \"${{task_id}}\" =~ ^[0-9]+$ ]]; then")?;
    writeln!(out, "    echo \"invalid task index: ${{task_id}}\" >&2")?;
    writeln!(out, "    exit 2")?;
    writeln!(out, "fi")?;
    writeln!(out, "task_id=$(( 10#${{task_id}} ))")?;
    writeln!(out, "first=$(( task_id * runs_per_task ))")?;
    writeln!(out, "if (( first >= grid_size )); then")?;
    writeln!(
        out,
        "    echo \"task index ${{task_id}} outside 0-{}\" >&2",
        parts.tasks.saturating_sub(1)
    )?;
    writeln!(out, "    exit 2")?;
    writeln!(out, "fi")?;
    writeln!(out, "last=$(( first + runs_per_task ))")?;
    writeln!(out, "if (( last > grid_size )); then last=${{grid_size}}; fi")?;
    writeln!(out, "mkdir -p \"${{outdir}}\"")?;
    writeln!(out)?;

    let command_display = parts.template.display();
    writeln!(out, "# command: {command_display}")?;
    writeln!(out, "status=0")?;
    writeln!(
        out,
        "for (( run_index = first; run_index < last; run_index++ )); do"
    )?;
    writeln!(out, "    idx=${{run_index}}")?;
    for axis in grid.axes().iter().rev() {
        let name = axis.name();
        writeln!(
            out,
            "    i_{name}=$(( idx % {len} )); idx=$(( idx / {len} ))",
            len = axis.len()
        )?;
    }
    for axis in grid.axes() {
        let name = axis.name();
        writeln!(out, "    v_{name}=\"${{p_{name}[i_{name}]}}\"")?;
    }
    writeln!(
        out,
        "    outfile=\"${{outdir}}/${{job_name}}-${{array_job_id}}-r${{run_index}}.out\""
    )?;
    writeln!(
        out,
        "    printf '# command: %s\\n' {} > \"${{outfile}}\"",
        shell::quote(&command_display)
    )?;
    let mut header_format = String::from("# index=%s");
    let mut header_args = String::from(" \"${run_index}\"");
    for axis in grid.axes() {
        let name = axis.name();
        write!(header_format, " {name}=%s")?;
        write!(header_args, " \"${{v_{name}}}\"")?;
    }
    writeln!(
        out,
        "    printf '{header_format}\\n'{header_args} | tee -a \"${{outfile}}\""
    )?;
    writeln!(
        out,
        "    {} 2>&1 | tee -a \"${{outfile}}\"",
        render_invocation(parts.template, grid)
    )?;
    writeln!(out, "    rc=${{PIPESTATUS[0]}}")?;
    writeln!(out, "    if (( rc != 0 )); then")?;
    writeln!(
        out,
        "        echo \"run ${{run_index}} exited with status ${{rc}}\" >&2"
    )?;
    writeln!(out, "        status=1")?;
    writeln!(out, "    fi")?;
    writeln!(out, "done")?;
    writeln!(out, "exit ${{status}}")?;
    Ok(())
}

fn render_invocation(template: &CommandTemplate, grid: &ParameterGrid) -> String {
    let mut words = template
        .args()
        .iter()
        .map(|arg| render_word(arg))
        .collect::<Vec<_>>();
    for axis in template.flag_axes(grid) {
        let name = axis.name();
        words.push(format!("\"--{name}=${{v_{name}}}\""));
    }
    words.join(" ")
}

fn render_word(segments: &[Segment]) -> String {
    if let [Segment::Literal(text)] = segments {
        return shell::quote(text);
    }
    let mut word = String::from("\"");
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                for c in text.chars() {
                    if matches!(c, '"' | '\\' | '$' | '`') {
                        word.push('\\');
                    }
                    word.push(c);
                }
            }
            Segment::Placeholder(name) => word.push_str(&format!("${{v_{name}}}")),
        }
    }
    word.push('"');
    word
}
