//! `run` and `resume`: drive the plan through the runner with fail-fast.
//!
//! The ledger decides skip versus execute; the report only records what this
//! invocation saw. `resume` is `run` with the config path recovered from the
//! previous report.
use super::context::MigrationContext;
use super::validate::validate_required_parameters;
use super::{record_failure, CommandStatus};
use crate::cli::{ResumeArgs, RunArgs};
use crate::error::ConfigError;
use crate::paths::ArtifactPaths;
use crate::report::{load_report, ReportSink, StepReportStatus};
use crate::runner::{failure_hint, run_step, StepEvent, StepInvocation};
use crate::state::StateLedger;
use crate::step_map::Plan;
use anyhow::Result;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

struct RunRequest<'a> {
    config: &'a Path,
    root: &'a Path,
    out: &'a Path,
    mode: Option<&'a str>,
    step_map: Option<&'a Path>,
}

/// A step that stopped the run.
struct StepFailure {
    id: String,
    meta: Value,
}

pub fn run_run(args: &RunArgs) -> Result<CommandStatus> {
    execute(&RunRequest {
        config: &args.config,
        root: &args.common.root,
        out: &args.common.out,
        mode: args.mode.as_deref(),
        step_map: args.step_map.as_deref(),
    })
}

pub fn run_resume(args: &ResumeArgs) -> Result<CommandStatus> {
    let config = match &args.config {
        Some(path) => path.clone(),
        None => config_from_previous_report(&ArtifactPaths::new(args.common.out.clone()))?,
    };
    tracing::info!(config = %config.display(), "resuming run");
    execute(&RunRequest {
        config: &config,
        root: &args.common.root,
        out: &args.common.out,
        mode: args.mode.as_deref(),
        step_map: args.step_map.as_deref(),
    })
}

fn config_from_previous_report(artifacts: &ArtifactPaths) -> Result<PathBuf> {
    let report_path = artifacts.report_path();
    if !report_path.exists() {
        return Err(ConfigError::ResumeConfigUnknown(report_path).into());
    }
    let report = load_report(&report_path)?;
    let recorded = report.config_path.trim();
    if recorded.is_empty() {
        return Err(ConfigError::ResumeConfigUnknown(report_path).into());
    }
    Ok(PathBuf::from(recorded))
}

fn execute(request: &RunRequest<'_>) -> Result<CommandStatus> {
    let artifacts = ArtifactPaths::new(request.out.to_path_buf());
    let mut sink = ReportSink::start(
        artifacts.report_path(),
        artifacts.log_path(),
        "run",
        &request.config.display().to_string(),
    )?;
    let ctx = record_failure(
        &mut sink,
        MigrationContext::load(request.config, request.root, request.out),
    )?;
    let plan = record_failure(&mut sink, ctx.plan(request.mode, request.step_map))?;
    sink.set_plan(&plan)?;
    record_failure(
        &mut sink,
        validate_required_parameters(&plan.mode, &ctx.config).map_err(Into::into),
    )?;

    let ledger = record_failure(&mut sink, StateLedger::open(&ctx.artifacts.state_path()))?;
    tracing::debug!(ledger = %ledger.path().display(), steps = plan.steps.len(), "executing plan");
    let outcome = execute_steps(&ctx, &plan, &ledger, &mut sink);
    let failure = record_failure(&mut sink, outcome)?;

    match failure {
        Some(failure) => {
            sink.finish(false, &format!("Run failed at step: {}", failure.id))?;
            tracing::error!(step = %failure.id, "run failed");
            println!(
                "RUN: FAIL at {} (see {})",
                failure.id,
                sink.run_log().path().display()
            );
            if let Some(hint) = failure_hint(&failure.meta) {
                println!("OUT {hint}");
            }
            Ok(CommandStatus::RunFailed)
        }
        None => {
            sink.finish(true, "Run completed successfully.")?;
            tracing::info!(mode = %plan.mode, steps = plan.steps.len(), "run completed");
            println!("RUN: PASS");
            Ok(CommandStatus::Success)
        }
    }
}

/// Run pending steps in order; stop at the first failure.
fn execute_steps(
    ctx: &MigrationContext,
    plan: &Plan,
    ledger: &StateLedger,
    sink: &mut ReportSink,
) -> Result<Option<StepFailure>> {
    let env = ctx.config.env();
    for step in &plan.steps {
        let name = step.display_name();
        if ledger.is_done(&step.id)? {
            tracing::debug!(step = %step.id, "skipping completed step");
            sink.log(&format!("SKIP {} ({name}) - already DONE", step.id))?;
            sink.add_step(
                &step.id,
                name,
                StepReportStatus::Skipped,
                json!({"reason": "already_done"}),
            )?;
            continue;
        }

        if let Some(previous) = ledger.record(&step.id)? {
            tracing::info!(step = %step.id, previous = ?previous.status, "re-attempting step");
        }
        sink.log(&format!("RUN  {} ({name}) -> {}", step.id, step.script))?;
        tracing::info!(step = %step.id, script = %step.script, "running step");
        let log = sink.run_log().clone();
        let invocation = StepInvocation {
            root: ctx.repo.root(),
            script: &step.script,
            args: &step.args,
            env,
            env_remove: &[],
            interpreter: None,
        };
        let outcome = run_step(&invocation, &mut |event| match event {
            StepEvent::Command(line) => log.append_lossy(&format!("CMD {line}")),
            StepEvent::Output(line) => log.append_lossy(&format!("OUT {line}")),
        });

        if outcome.success {
            ledger.mark_done(&step.id, outcome.meta.clone())?;
            sink.add_step(&step.id, name, StepReportStatus::Done, outcome.meta)?;
        } else {
            ledger.mark_failed(&step.id, outcome.meta.clone())?;
            sink.add_step(
                &step.id,
                name,
                StepReportStatus::Failed,
                outcome.meta.clone(),
            )?;
            return Ok(Some(StepFailure {
                id: step.id.clone(),
                meta: outcome.meta,
            }));
        }
    }
    Ok(None)
}
