//! `plan`: expand and validate a mode without executing anything.
use super::context::MigrationContext;
use super::validate::validate_required_parameters;
use super::{record_failure, CommandStatus};
use crate::cli::PlanArgs;
use crate::paths::ArtifactPaths;
use crate::report::ReportSink;
use anyhow::Result;

pub fn run_plan(args: &PlanArgs) -> Result<CommandStatus> {
    let artifacts = ArtifactPaths::new(args.common.out.clone());
    let mut sink = ReportSink::start(
        artifacts.report_path(),
        artifacts.log_path(),
        "plan",
        &args.config.display().to_string(),
    )?;
    let ctx = record_failure(
        &mut sink,
        MigrationContext::load(&args.config, &args.common.root, &args.common.out),
    )?;
    let plan = record_failure(
        &mut sink,
        ctx.plan(args.mode.as_deref(), args.step_map.as_deref()),
    )?;
    record_failure(
        &mut sink,
        validate_required_parameters(&plan.mode, &ctx.config).map_err(Into::into),
    )?;

    sink.set_plan(&plan)?;
    sink.finish(true, "Plan generated (no execution).")?;
    tracing::info!(mode = %plan.mode, steps = plan.steps.len(), "plan generated");
    println!("PLAN: generated in {}", artifacts.report_path().display());
    Ok(CommandStatus::Success)
}
