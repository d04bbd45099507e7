use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use sweep_grid::TaskIndex;
use sweep_job::read_job_script;

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Array job script written by `sweep make`.
    pub script: PathBuf,
    /// Indices to decode; every grid point when omitted.
    pub indices: Vec<usize>,
    /// Treat the numbers as array task ids and list the points each one runs.
    #[arg(long)]
    pub task: bool,
}

pub fn run(args: &DecodeArgs) -> Result<(), Box<dyn Error>> {
    let header = read_job_script(&args.script)?;
    let grid = &header.grid;
    let indices: Vec<TaskIndex> = if args.indices.is_empty() {
        grid.indices().collect()
    } else if args.task {
        let runs = header.runs_per_task;
        args.indices
            .iter()
            .flat_map(|task| {
                let first = task.saturating_mul(runs);
                let end = first.saturating_add(runs).min(grid.size());
                // A task past the end still yields its first index, which fails to decode.
                (first..end.max(first.saturating_add(1))).map(TaskIndex::from_raw)
            })
            .collect()
    } else {
        args.indices.iter().copied().map(TaskIndex::from_raw).collect()
    };
    for index in indices {
        let combination = grid.decode(index)?;
        println!("{index} {combination}");
    }
    Ok(())
}
