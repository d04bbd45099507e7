use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use sweep_core::errors::{ErrorInfo, SweepError};
use tracing::debug;

use crate::scheduler::{
    DependencyCondition, JobId, Scheduler, SubmitRequest, PRIMARY_JOB_ENV,
};

/// Submits jobs through `sbatch`, piping the script on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmScheduler {
    program: String,
}

impl Default for SlurmScheduler {
    fn default() -> Self {
        Self::new("sbatch")
    }
}

impl SlurmScheduler {
    /// Uses `program` as the submission command.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Submission command.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for one submission.
    pub fn arguments(request: &SubmitRequest<'_>) -> Vec<String> {
        let job = request.job;
        let mut args = vec!["--parsable".to_string(), format!("--job-name={}", job.name)];
        if let Some(tasks) = job.array_tasks {
            args.push(format!("--array=0-{}", tasks.saturating_sub(1)));
        }
        if let Some(log) = &job.log {
            args.push(format!("--output={}", log.display()));
        }
        if let Some(dependency) = request.dependency {
            args.push(format!(
                "--dependency={}:{}",
                condition_keyword(dependency.condition),
                dependency.on
            ));
            args.push(format!("--export=ALL,{PRIMARY_JOB_ENV}={}", dependency.on));
        }
        args
    }
}

/// Slurm spelling of a dependency condition.
pub fn condition_keyword(condition: DependencyCondition) -> &'static str {
    match condition {
        DependencyCondition::AfterAny => "afterany",
        DependencyCondition::AfterOk => "afterok",
        DependencyCondition::AfterNotOk => "afternotok",
    }
}

fn job_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `--parsable` prints `<id>` or `<id>;<cluster>`; plain sbatch ends with the id.
    PATTERN.get_or_init(|| Regex::new(r"(\d+)(?:;\S+)?$").expect("static job id pattern"))
}

/// Extracts the job id from `sbatch` output.
pub fn parse_job_id(stdout: &str) -> Result<JobId, SweepError> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| job_id_pattern().captures(line))
        .and_then(|captures| captures.get(1))
        .map(|id| JobId::new(id.as_str()))
        .ok_or_else(|| {
            SweepError::Submission(
                ErrorInfo::new("job_id_parse", "scheduler output carries no job id")
                    .with_context("stdout", stdout.trim()),
            )
        })
}

impl Scheduler for SlurmScheduler {
    fn submit(&mut self, request: &SubmitRequest<'_>) -> Result<JobId, SweepError> {
        let args = Self::arguments(request);
        debug!(program = %self.program, ?args, "invoking scheduler");
        let spawn_error = |err: std::io::Error| {
            SweepError::Submission(
                ErrorInfo::new("scheduler_spawn", err.to_string())
                    .with_context("program", self.program.as_str())
                    .with_context("job", request.job.name.as_str()),
            )
        };
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.job.script.as_bytes())
                .map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SweepError::Submission(
                ErrorInfo::new("scheduler_rejected", stderr.trim())
                    .with_context("program", self.program.as_str())
                    .with_context("job", request.job.name.as_str())
                    .with_context("status", output.status.to_string()),
            ));
        }
        parse_job_id(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_come_from_the_last_line() {
        assert_eq!(parse_job_id("4242\n").expect("id"), JobId::new("4242"));
        assert_eq!(parse_job_id("4242;cluster-a\n").expect("id"), JobId::new("4242"));
        assert_eq!(
            parse_job_id("Submitted batch job 977\n").expect("id"),
            JobId::new("977")
        );
        assert!(parse_job_id("sbatch: error: invalid partition\n").is_err());
        assert!(parse_job_id("").is_err());
    }
}
