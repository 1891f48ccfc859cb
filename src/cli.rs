//! CLI argument parsing for the migration orchestrator.
//!
//! The CLI stays thin: every command maps onto one workflow function and all
//! parameters come from the config file or the environment allow-list.
use crate::paths::DEFAULT_OUTDIR;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "migctl",
    version,
    about = "Resumable, gated orchestration of MySQL to MariaDB migrations",
    after_help = "Commands:\n  assess --config <yaml>             Read-only gates, warnings, and inventory\n  plan --config <yaml> --mode <m>    Expand and validate a mode (no execution)\n  run --config <yaml> --mode <m>     Execute steps with fail-fast and resume state\n  resume --mode <m>                  Re-run, skipping steps already DONE\n\nExamples:\n  migctl assess --config migration.yaml\n  migctl plan --config migration.yaml --mode offline\n  migctl run --config migration.yaml --playbook two_step --non-interactive\n  migctl resume --mode two_step --out artifacts",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Assess(AssessArgs),
    Plan(PlanArgs),
    Run(RunArgs),
    Resume(ResumeArgs),
}

/// Locations shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Output directory for state.json, report.json, and run.log
    #[arg(long, short = 'o', value_name = "DIR", default_value = DEFAULT_OUTDIR)]
    pub out: PathBuf,

    /// Migration kit root containing scripts/, sql/, and orchestrator/
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Run read-only assessment: safety gates, warnings, and inventory")]
pub struct AssessArgs {
    /// Source config YAML
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Never prompt (always the case; accepted for CI scripts)
    #[arg(long)]
    pub non_interactive: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Generate a plan from config and step map (no execution)")]
pub struct PlanArgs {
    /// Migration config YAML
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: PathBuf,

    /// Execution mode/playbook (e.g. offline, one_step, two_step, near_zero)
    #[arg(long, short = 'm', visible_alias = "playbook", value_name = "MODE")]
    pub mode: Option<String>,

    /// Step map YAML (default: <root>/orchestrator/step_map.yaml)
    #[arg(long, value_name = "PATH")]
    pub step_map: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Execute migration steps with resume-safe state tracking")]
pub struct RunArgs {
    /// Migration config YAML
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: PathBuf,

    /// Execution mode/playbook (e.g. offline, one_step, two_step, near_zero)
    #[arg(long, short = 'm', visible_alias = "playbook", value_name = "MODE")]
    pub mode: Option<String>,

    /// Step map YAML (default: <root>/orchestrator/step_map.yaml)
    #[arg(long, value_name = "PATH")]
    pub step_map: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Never prompt (always the case; accepted for CI scripts)
    #[arg(long)]
    pub non_interactive: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resume a previous run using the state.json checkpoint")]
pub struct ResumeArgs {
    /// Migration config YAML; defaults to the path recorded in report.json
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Execution mode/playbook override
    #[arg(long, short = 'm', visible_alias = "playbook", value_name = "MODE")]
    pub mode: Option<String>,

    /// Step map YAML (default: <root>/orchestrator/step_map.yaml)
    #[arg(long, value_name = "PATH")]
    pub step_map: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Never prompt (always the case; accepted for CI scripts)
    #[arg(long)]
    pub non_interactive: bool,
}
