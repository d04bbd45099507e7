use serde::{Deserialize, Serialize};
use sweep_core::errors::SweepError;
use tracing::{info, warn};

use crate::emit::JobDescriptor;
use crate::scheduler::{
    Dependency, DependencyCondition, DependencyLink, JobId, Scheduler, SubmitRequest,
};

/// Identifiers of a submitted array job and its gather job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// Array job id.
    pub primary: JobId,
    /// Gather job id.
    pub gather: JobId,
    /// The dependency the scheduler accepted.
    pub link: DependencyLink,
}

/// Submits `primary`, then `gather` with a dependency on it.
///
/// A rejected primary submission returns immediately: the gather job is
/// never handed to the scheduler.
pub fn submit_chain<S: Scheduler + ?Sized>(
    scheduler: &mut S,
    primary: &JobDescriptor,
    gather: &JobDescriptor,
    condition: DependencyCondition,
) -> Result<ChainReceipt, SweepError> {
    let primary_id = scheduler
        .submit(&SubmitRequest {
            job: primary,
            dependency: None,
        })
        .inspect_err(|err| warn!(job = %primary.name, error = %err, "array job rejected"))?;
    info!(job = %primary.name, id = %primary_id, "submitted array job");

    let dependency = Dependency {
        on: primary_id.clone(),
        condition,
    };
    let gather_id = scheduler
        .submit(&SubmitRequest {
            job: gather,
            dependency: Some(&dependency),
        })
        .map_err(|err| err.with_context("primary_job", primary_id.as_str()))
        .inspect_err(|err| warn!(job = %gather.name, error = %err, "gather job rejected"))?;
    info!(
        job = %gather.name,
        id = %gather_id,
        after = %primary_id,
        %condition,
        "submitted gather job"
    );

    Ok(ChainReceipt {
        link: DependencyLink {
            primary: primary_id.clone(),
            dependent: gather_id.clone(),
            condition,
        },
        primary: primary_id,
        gather: gather_id,
    })
}
