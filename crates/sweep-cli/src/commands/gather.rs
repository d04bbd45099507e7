use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use sweep_core::errors::io_error;
use sweep_job::{
    gather, gather_labels, read_job_script, render_json, render_labels_json, render_labels_table,
    render_table, resolve_summary_path, ExtractionRule, JobId, OutputLayout, ResultRow,
    SummaryOptions,
};
use tracing::{info, warn};

use crate::config::SweepConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
pub struct GatherArgs {
    /// Array job script written by `sweep make`.
    pub script: PathBuf,
    /// Array job id the outputs were written under.
    #[arg(long)]
    pub job_id: String,
    /// Output directory, when the outputs were moved after the run.
    #[arg(long)]
    pub outdir: Option<PathBuf>,
    /// Directory receiving the summary.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Summary path; defaults to `<data dir>/<job name>`.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// last-number, labelled:LABEL or field:LINE:FIELD.
    #[arg(long)]
    pub rule: Option<ExtractionRule>,
    /// One column per `label value` pair found in the outputs.
    #[arg(long, conflicts_with = "rule")]
    pub all_labels: bool,
    /// Header of the value column.
    #[arg(long, default_value = "value")]
    pub value_name: String,
    #[arg(long, value_enum, default_value_t = SummaryFormat::Table)]
    pub format: SummaryFormat,
}

pub fn run(args: &GatherArgs, config: &SweepConfig) -> Result<(), Box<dyn Error>> {
    let header = read_job_script(&args.script)?;
    let job_id = JobId::new(args.job_id.trim());
    let layout = OutputLayout {
        dir: args.outdir.clone().unwrap_or_else(|| header.output_dir.clone()),
        job_name: header.job_name.clone(),
        array_job_id: job_id.clone(),
    };
    let options = SummaryOptions {
        value_name: args.value_name.clone(),
        command: header.command.clone(),
    };

    let (summary, total, failed, mode) = if args.all_labels {
        let rows = gather_labels(&header.grid, &layout)?;
        let summary = match args.format {
            SummaryFormat::Table => render_labels_table(&header.grid, &rows, &options)?,
            SummaryFormat::Json => render_labels_json(&header.grid, &rows, &options)?,
        };
        (summary, rows.len(), count_failed(&rows), "all-labels".to_string())
    } else {
        let rule = args
            .rule
            .clone()
            .unwrap_or_else(|| config.job.extraction.clone());
        let rows = gather(&header.grid, &layout, &rule)?;
        let summary = match args.format {
            SummaryFormat::Table => render_table(&header.grid, &rows, &options)?,
            SummaryFormat::Json => render_json(&header.grid, &rows, &options)?,
        };
        (summary, rows.len(), count_failed(&rows), rule.to_string())
    };
    if failed > 0 {
        warn!(failed, total, "some grid points have no value");
    }
    let extension = match args.format {
        SummaryFormat::Table => "",
        SummaryFormat::Json => ".json",
    };

    let requested = match &args.out {
        Some(path) => path.clone(),
        None => args
            .data_dir
            .clone()
            .or_else(|| config.paths.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("{}{extension}", header.job_name)),
    };
    if let Some(parent) = requested.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| io_error("data_dir", parent, err))?;
    }
    let path = resolve_summary_path(&requested, Some(&job_id));
    fs::write(&path, summary).map_err(|err| io_error("summary_write", &path, err))?;
    info!(
        summary = %path.display(),
        rows = total,
        failed,
        rule = %mode,
        "wrote summary"
    );
    println!("{}", path.display());
    Ok(())
}

fn count_failed<T>(rows: &[ResultRow<T>]) -> usize {
    rows.iter().filter(|row| row.value().is_none()).count()
}
