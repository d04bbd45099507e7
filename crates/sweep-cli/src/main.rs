use std::error::Error;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    decode::{self, DecodeArgs},
    gather::{self, GatherArgs},
    make::{self, MakeArgs},
    submit::{self, SubmitArgs},
    version::{self, VersionArgs},
};
use config::SweepConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "sweep", about = "Parameter-sweep array jobs for batch schedulers")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output (repeat for trace level).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand parameter declarations into an array job script.
    Make(MakeArgs),
    /// Submit an array job script with a dependent gather job.
    Submit(SubmitArgs),
    /// Collate per-task outputs into a summary table.
    Gather(GatherArgs),
    /// Print the parameter combination of task indices.
    Decode(DecodeArgs),
    /// Print version information.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    init_tracing(cli.verbose, cli.quiet);
    let config = SweepConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Make(args) => make::run(args, matches.subcommand_matches("make"), &config),
        Command::Submit(args) => submit::run(args, &config),
        Command::Gather(args) => gather::run(args, &config),
        Command::Decode(args) => decode::run(args),
        Command::Version(args) => version::run(args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Some("sweep=warn"),
        (false, 0) => None,
        (false, 1) => Some("sweep=debug"),
        (false, _) => Some("sweep=trace"),
    };
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sweep=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
