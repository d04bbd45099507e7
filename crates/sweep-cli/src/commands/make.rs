use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{ArgMatches, Args};
use sweep_core::errors::{ErrorInfo, SweepError};
use sweep_grid::{build, load_plan, GridLimits, ParameterSpec, SweepPlan};
use sweep_job::{emit, CommandTemplate, EmitOptions};
use tracing::info;

use crate::config::SweepConfig;

#[derive(Args, Debug)]
pub struct MakeArgs {
    /// YAML plan with parameters, command and job name.
    #[arg(long)]
    pub plan: Option<PathBuf>,
    /// Linearly spaced parameter.
    #[arg(long = "param-linspace", value_name = "NAME,START,STOP,COUNT")]
    pub param_linspace: Vec<String>,
    /// Parameter spaced evenly between 10^START and 10^STOP.
    #[arg(long = "param-logspace", value_name = "NAME,START,STOP,COUNT")]
    pub param_logspace: Vec<String>,
    /// Parameter with explicit values.
    #[arg(long = "param-list", value_name = "NAME,V1[,V2...]")]
    pub param_list: Vec<String>,
    /// Script path; defaults to `<job name>.sh`.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Base directory for relative script paths.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Directory receiving per-run outputs.
    #[arg(long)]
    pub outdir: Option<PathBuf>,
    /// Directory for scheduler logs; defaults to the output directory.
    #[arg(long)]
    pub logdir: Option<PathBuf>,
    /// Scheduler job name; defaults to the plan name or the script stem.
    #[arg(long)]
    pub job_name: Option<String>,
    /// Grid points run sequentially by each array task.
    #[arg(long)]
    pub runs_per_task: Option<usize>,
    /// Largest accepted grid.
    #[arg(long)]
    pub max_grid_size: Option<usize>,
    /// Target command after `--`; `{name}` is replaced by the value of `name`
    /// and other parameters are appended as `--name=value`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

pub fn run(
    args: &MakeArgs,
    matches: Option<&ArgMatches>,
    config: &SweepConfig,
) -> Result<(), Box<dyn Error>> {
    let plan = args.plan.as_deref().map(load_plan).transpose()?;
    let specs = declarations(args, matches, plan.as_ref())?;
    let limits = GridLimits {
        max_size: args.max_grid_size.unwrap_or(config.limits.max_grid_size),
    };
    let grid = build(&specs, &limits)?;

    let command = if args.command.is_empty() {
        plan.as_ref().map(|plan| plan.command.clone()).unwrap_or_default()
    } else {
        args.command.clone()
    };
    let template = CommandTemplate::new(command)?;

    let job_name = args
        .job_name
        .clone()
        .or_else(|| plan.as_ref().and_then(|plan| plan.name.clone()))
        .or_else(|| script_stem(args.out.as_deref()))
        .unwrap_or_else(|| "sweep".to_string());
    let script_path = resolve_script_path(args, config, &job_name);
    let output_dir = absolute(
        args.outdir
            .clone()
            .or_else(|| config.paths.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("out")),
    )?;
    let options = EmitOptions {
        job_name,
        output_dir,
        runs_per_task: args.runs_per_task.unwrap_or(config.job.runs_per_task),
        log_dir: args.logdir.clone().map(absolute).transpose()?,
    };

    let job = emit(&grid, &template, &options)?;
    job.write_to(&script_path)?;
    info!(
        script = %script_path.display(),
        points = grid.size(),
        tasks = job.array_tasks.unwrap_or(1),
        "wrote array job"
    );
    println!("{}", script_path.display());
    Ok(())
}

/// Plan parameters first, then command-line declarations in the order given.
fn declarations(
    args: &MakeArgs,
    matches: Option<&ArgMatches>,
    plan: Option<&SweepPlan>,
) -> Result<Vec<ParameterSpec>, SweepError> {
    type ParseFn = fn(&str) -> Result<ParameterSpec, SweepError>;
    let sources: [(&str, &[String], ParseFn); 3] = [
        (
            "param_linspace",
            args.param_linspace.as_slice(),
            ParameterSpec::parse_linspace as ParseFn,
        ),
        (
            "param_logspace",
            args.param_logspace.as_slice(),
            ParameterSpec::parse_logspace as ParseFn,
        ),
        (
            "param_list",
            args.param_list.as_slice(),
            ParameterSpec::parse_list as ParseFn,
        ),
    ];
    let mut positioned = Vec::new();
    for (id, declarations, parse) in sources {
        let positions = matches
            .and_then(|matches| matches.indices_of(id))
            .map(|indices| indices.collect::<Vec<_>>())
            .unwrap_or_default();
        for (nth, declaration) in declarations.iter().enumerate() {
            let position = positions.get(nth).copied().unwrap_or(usize::MAX);
            positioned.push((position, parse(declaration)?));
        }
    }
    positioned.sort_by_key(|(position, _)| *position);

    let mut specs = plan
        .map(|plan| plan.parameters.clone())
        .unwrap_or_default();
    specs.extend(positioned.into_iter().map(|(_, spec)| spec));
    if specs.is_empty() {
        return Err(SweepError::InvalidSpec(
            ErrorInfo::new("no_parameters", "no parameters declared")
                .with_hint("use --param-linspace, --param-logspace, --param-list or --plan"),
        ));
    }
    Ok(specs)
}

fn script_stem(out: Option<&Path>) -> Option<String> {
    out.and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
}

fn resolve_script_path(args: &MakeArgs, config: &SweepConfig, job_name: &str) -> PathBuf {
    let path = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{job_name}.sh")));
    if path.is_absolute() {
        return path;
    }
    match args.dir.as_ref().or(config.paths.script_dir.as_ref()) {
        Some(base) => base.join(path),
        None => path,
    }
}

/// Array tasks may start in another working directory.
fn absolute(path: PathBuf) -> Result<PathBuf, SweepError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()
        .map_err(|err| sweep_core::io_error("current_dir", Path::new("."), err))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        make: MakeArgs,
    }

    fn names(argv: &[&str]) -> Vec<String> {
        let matches = <Harness as clap::CommandFactory>::command().get_matches_from(argv);
        let harness = <Harness as clap::FromArgMatches>::from_arg_matches(&matches).expect("args");
        declarations(&harness.make, Some(&matches), None)
            .expect("declarations")
            .into_iter()
            .map(|spec| spec.name)
            .collect()
    }

    #[test]
    fn declaration_order_survives_mixed_flags() {
        assert_eq!(
            names(&[
                "make",
                "--param-list",
                "mode,a,b",
                "--param-linspace",
                "x,0,1,3",
                "--param-logspace",
                "lr,-3,-1,3",
                "--param-list",
                "seed,1,2",
                "--",
                "train",
            ]),
            ["mode", "x", "lr", "seed"]
        );
    }

    #[test]
    fn no_declarations_is_an_error() {
        let harness = Harness::parse_from(["make", "--", "train"]);
        let err = declarations(&harness.make, None, None).expect_err("empty");
        assert_eq!(err.code(), "no_parameters");
        assert_eq!(harness.make.command, ["train"]);
    }
}
