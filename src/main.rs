mod assess;
mod cli;
mod config;
mod error;
mod paths;
mod report;
mod runner;
mod state;
mod step_map;
mod util;
mod workflow;

use clap::Parser;
use cli::{Command, RootArgs};
use error::ConfigError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration errors (bad mode, missing parameter, ...).
const EXIT_CONFIG_ERROR: u8 = 4;

fn main() -> ExitCode {
    init_tracing();
    let args = RootArgs::parse();

    let result = match &args.command {
        Command::Assess(args) => workflow::run_assess(args),
        Command::Plan(args) => workflow::run_plan(args),
        Command::Run(args) => workflow::run_run(args),
        Command::Resume(args) => workflow::run_resume(args),
    };
    match result {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("migctl=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
