use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sweep_core::errors::{ErrorInfo, SweepError};

use crate::emit::JobDescriptor;

/// Environment variable through which a dependent job learns the id of the
/// job it waits on. Scheduler backends export it alongside the dependency.
pub const PRIMARY_JOB_ENV: &str = "SWEEP_PRIMARY_JOB_ID";

/// Scheduler-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wraps a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When a dependent job may start relative to the job it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyCondition {
    /// Once every task has reached a terminal state, whatever the outcome.
    #[default]
    AfterAny,
    /// Only if every task succeeded.
    AfterOk,
    /// Only if at least one task failed.
    AfterNotOk,
}

impl DependencyCondition {
    /// Kebab-case name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCondition::AfterAny => "after-any",
            DependencyCondition::AfterOk => "after-ok",
            DependencyCondition::AfterNotOk => "after-not-ok",
        }
    }
}

impl fmt::Display for DependencyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyCondition {
    type Err = SweepError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "after-any" | "afterany" => Ok(DependencyCondition::AfterAny),
            "after-ok" | "afterok" => Ok(DependencyCondition::AfterOk),
            "after-not-ok" | "afternotok" => Ok(DependencyCondition::AfterNotOk),
            _ => Err(SweepError::Config(
                ErrorInfo::new("dependency_condition", format!("unknown condition '{text}'"))
                    .with_hint("use after-any, after-ok or after-not-ok"),
            )),
        }
    }
}

/// Dependency attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Job that must reach the condition first.
    pub on: JobId,
    /// Condition on that job.
    pub condition: DependencyCondition,
}

/// Record of an accepted dependency between two submitted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLink {
    /// The job waited on.
    pub primary: JobId,
    /// The waiting job.
    pub dependent: JobId,
    /// Condition the dependent waits for.
    pub condition: DependencyCondition,
}

/// One submission handed to a [`Scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    /// Job to submit.
    pub job: &'a JobDescriptor,
    /// Optional dependency on an earlier job.
    pub dependency: Option<&'a Dependency>,
}

/// Boundary to the batch scheduler.
pub trait Scheduler {
    /// Submits a job and returns its identifier, or
    /// [`SweepError::Submission`] when the scheduler rejects it.
    fn submit(&mut self, request: &SubmitRequest<'_>) -> Result<JobId, SweepError>;
}

impl<S: Scheduler + ?Sized> Scheduler for &mut S {
    fn submit(&mut self, request: &SubmitRequest<'_>) -> Result<JobId, SweepError> {
        (**self).submit(request)
    }
}
