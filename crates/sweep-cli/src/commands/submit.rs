use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use sweep_core::errors::{io_error, SweepError};
use sweep_job::shell;
use sweep_job::{
    read_job_script, submit_chain, DependencyCondition, ExtractionRule, JobDescriptor, JobId,
    Scheduler, SlurmScheduler, SubmitRequest, PRIMARY_JOB_ENV,
};

use crate::config::SweepConfig;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Array job script written by `sweep make`.
    pub script: PathBuf,
    /// Directory receiving the gathered summary.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// When the gather job may start: after-any, after-ok or after-not-ok.
    #[arg(long)]
    pub dependency: Option<DependencyCondition>,
    /// Extraction rule handed to the gather job.
    #[arg(long)]
    pub rule: Option<ExtractionRule>,
    /// Gather every `label value` pair into its own column.
    #[arg(long, conflicts_with = "rule")]
    pub all_labels: bool,
    /// Post-processing program chained instead of `sweep gather`; it is
    /// called as `PROGRAM JOBID OUTDIR DATADIR`.
    #[arg(long, conflicts_with_all = ["rule", "all_labels"])]
    pub process: Option<PathBuf>,
    /// Header of the summary value column.
    #[arg(long, default_value = "value")]
    pub value_name: String,
    /// Submission command replacing `scheduler.submit_command`.
    #[arg(long)]
    pub submit_command: Option<String>,
    /// Print the submissions instead of contacting the scheduler.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: &SubmitArgs, config: &SweepConfig) -> Result<(), Box<dyn Error>> {
    let script_path = canonical(&args.script)?;
    let header = read_job_script(&script_path)?;
    let script = fs::read_to_string(&script_path)
        .map_err(|err| io_error("script_read", &script_path, err))?;
    let primary = JobDescriptor {
        name: header.job_name.clone(),
        script,
        array_tasks: Some(header.array_tasks),
        log: None,
    };

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.paths.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&data_dir).map_err(|err| io_error("data_dir", &data_dir, err))?;
    let data_dir = canonical(&data_dir)?;
    let rule = args
        .rule
        .clone()
        .unwrap_or_else(|| config.job.extraction.clone());
    let gather = gather_job(
        &header.job_name,
        &script_path,
        &data_dir,
        &rule,
        args,
        &header.output_dir,
    )?;

    let condition = args.dependency.unwrap_or(config.scheduler.dependency);
    let program = args
        .submit_command
        .clone()
        .unwrap_or_else(|| config.scheduler.submit_command.clone());
    let receipt = if args.dry_run {
        submit_chain(&mut DryRun::new(program), &primary, &gather, condition)?
    } else {
        submit_chain(&mut SlurmScheduler::new(program), &primary, &gather, condition)?
    };
    println!(
        "array job {} -> gather job {} ({})",
        receipt.primary, receipt.gather, receipt.link.condition
    );
    Ok(())
}

/// The gather job learns the array job id from the environment the
/// scheduler backend exports alongside the dependency.
fn gather_job(
    job_name: &str,
    script_path: &Path,
    data_dir: &Path,
    rule: &ExtractionRule,
    args: &SubmitArgs,
    output_dir: &Path,
) -> Result<JobDescriptor, SweepError> {
    let job_id = format!("\"${{{PRIMARY_JOB_ENV}:?array job id not exported}}\"");
    if let Some(program) = &args.process {
        let program = canonical(program)?;
        let command_line = format!(
            "{} {job_id} {} {}",
            shell::quote(&program.display().to_string()),
            shell::quote(&output_dir.display().to_string()),
            shell::quote(&data_dir.display().to_string()),
        );
        return Ok(JobDescriptor::wrap(
            format!("{job_name}-process"),
            &command_line,
            Some(output_dir.join(format!("{job_name}-process-%j.out"))),
        ));
    }

    let exe = std::env::current_exe()
        .map_err(|err| io_error("current_exe", Path::new("sweep"), err))?;
    let mut words = vec![
        exe.display().to_string(),
        "gather".to_string(),
        script_path.display().to_string(),
        "--data-dir".to_string(),
        data_dir.display().to_string(),
    ];
    if args.all_labels {
        words.push("--all-labels".to_string());
    } else {
        words.extend(["--rule".to_string(), rule.to_string()]);
        words.extend(["--value-name".to_string(), args.value_name.clone()]);
    }
    let command_line = format!("{} --job-id {job_id}", shell::join(&words));
    Ok(JobDescriptor::wrap(
        format!("{job_name}-gather"),
        &command_line,
        Some(output_dir.join(format!("{job_name}-gather-%j.out"))),
    ))
}

fn canonical(path: &Path) -> Result<PathBuf, SweepError> {
    fs::canonicalize(path).map_err(|err| io_error("path_resolve", path, err))
}

struct DryRun {
    program: String,
    submitted: usize,
}

impl DryRun {
    fn new(program: String) -> Self {
        Self {
            program,
            submitted: 0,
        }
    }
}

impl Scheduler for DryRun {
    fn submit(&mut self, request: &SubmitRequest<'_>) -> Result<JobId, SweepError> {
        self.submitted += 1;
        let mut argv = vec![self.program.clone()];
        argv.extend(SlurmScheduler::arguments(request));
        println!("{}", shell::join(&argv));
        if request.job.array_tasks.is_none() {
            print!("{}", request.job.script);
        }
        Ok(JobId::new(format!("dry-run-{}", self.submitted)))
    }
}
