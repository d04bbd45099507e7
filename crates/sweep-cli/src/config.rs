use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweep_core::errors::{io_error, ErrorInfo, SweepError};
use sweep_grid::GridLimits;
use sweep_job::{DependencyCondition, ExtractionRule};

/// Optional YAML configuration shared by all subcommands.
///
/// ```yaml
/// limits:
///   max_grid_size: 50000
/// paths:
///   script_dir: jobs
///   output_dir: /scratch/out
///   data_dir: results
/// scheduler:
///   submit_command: sbatch
///   dependency: after-any
/// job:
///   runs_per_task: 4
///   extraction: { rule: labelled, label: loss }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub limits: LimitsConfig,
    pub paths: PathsConfig,
    pub scheduler: SchedulerConfig,
    pub job: JobConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_grid_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_grid_size: GridLimits::default().max_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Where `make` writes scripts given by relative path.
    pub script_dir: Option<PathBuf>,
    /// Directory receiving per-run outputs.
    pub output_dir: Option<PathBuf>,
    /// Directory receiving gathered summaries.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub submit_command: String,
    pub dependency: DependencyCondition,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submit_command: "sbatch".to_string(),
            dependency: DependencyCondition::AfterAny,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub runs_per_task: usize,
    pub extraction: ExtractionRule,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            runs_per_task: 1,
            extraction: ExtractionRule::LastNumber,
        }
    }
}

impl SweepConfig {
    /// Loads the file at `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SweepError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = fs::read(path).map_err(|err| io_error("config_read", path, err))?;
        let config: SweepConfig = serde_yaml::from_slice(&bytes).map_err(|err| {
            SweepError::Config(
                ErrorInfo::new("config_parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.limits.max_grid_size == 0 {
            return Err(SweepError::Config(
                ErrorInfo::new("max_grid_size", "limits.max_grid_size must be positive")
                    .with_context("field", "limits.max_grid_size"),
            ));
        }
        if self.job.runs_per_task == 0 {
            return Err(SweepError::Config(
                ErrorInfo::new("runs_per_task", "job.runs_per_task must be positive")
                    .with_context("field", "job.runs_per_task"),
            ));
        }
        if self.scheduler.submit_command.trim().is_empty() {
            return Err(SweepError::Config(
                ErrorInfo::new("submit_command", "scheduler.submit_command is empty")
                    .with_context("field", "scheduler.submit_command"),
            ));
        }
        Ok(())
    }

    pub fn grid_limits(&self) -> GridLimits {
        GridLimits {
            max_size: self.limits.max_grid_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("config file");
        file.write_all(text.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = SweepConfig::load(None).expect("defaults");
        assert_eq!(config.limits.max_grid_size, 10_000);
        assert_eq!(config.scheduler.submit_command, "sbatch");
        assert_eq!(config.scheduler.dependency, DependencyCondition::AfterAny);
        assert_eq!(config.job.runs_per_task, 1);
        assert_eq!(config.job.extraction, ExtractionRule::LastNumber);
    }

    #[test]
    fn partial_files_keep_remaining_defaults() {
        let file = write_config(
            "limits:\n  max_grid_size: 64\nscheduler:\n  dependency: after-ok\njob:\n  extraction: { rule: labelled, label: loss }\n",
        );
        let config = SweepConfig::load(Some(file.path())).expect("config");
        assert_eq!(config.grid_limits().max_size, 64);
        assert_eq!(config.scheduler.dependency, DependencyCondition::AfterOk);
        assert_eq!(config.scheduler.submit_command, "sbatch");
        assert_eq!(
            config.job.extraction,
            ExtractionRule::Labelled {
                label: "loss".into()
            }
        );
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn invalid_files_are_config_errors() {
        let unknown = write_config("limits:\n  max_points: 3\n");
        let err = SweepConfig::load(Some(unknown.path())).expect_err("unknown key");
        assert!(matches!(err, SweepError::Config(_)));
        assert!(err.info().context.contains_key("path"));

        let zero = write_config("job:\n  runs_per_task: 0\n");
        let err = SweepConfig::load(Some(zero.path())).expect_err("zero runs");
        assert_eq!(err.code(), "runs_per_task");
    }
}
