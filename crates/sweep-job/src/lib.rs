#![doc = "Turns a parameter grid into a scheduler array job, chains a gather job behind it and collates the per-task outputs into a summary."]

/// Dependency-chained submission of the array and gather jobs.
pub mod chain;
/// Script emission for the array job.
pub mod emit;
/// Extraction rules applied to per-task output.
pub mod extract;
/// Per-task output collation.
pub mod gather;
/// Naming of per-task output artifacts.
pub mod layout;
/// Scheduler abstraction and dependency types.
pub mod scheduler;
/// Reading emitted scripts back.
pub mod script;
/// Shell quoting helpers.
pub mod shell;
/// Slurm backend for [`scheduler::Scheduler`].
pub mod slurm;
/// Summary rendering.
pub mod summary;
/// Command templates with parameter placeholders.
pub mod template;

pub use chain::{submit_chain, ChainReceipt};
pub use emit::{emit, EmitOptions, JobDescriptor};
pub use extract::{DataValue, Extract, ExtractionError, ExtractionRule, LabelSet};
pub use gather::{gather, gather_labels, OutputLocator, ResultRow, RowOutcome, TaskFailure};
pub use layout::OutputLayout;
pub use scheduler::{
    Dependency, DependencyCondition, DependencyLink, JobId, Scheduler, SubmitRequest,
    PRIMARY_JOB_ENV,
};
pub use script::{parse_script, read_job_script, ScriptHeader};
pub use slurm::SlurmScheduler;
pub use summary::{
    render_json, render_labels_json, render_labels_table, render_table, resolve_summary_path,
    SummaryOptions,
};
pub use template::{CommandTemplate, Segment};
