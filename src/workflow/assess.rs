//! `assess`: read-only gates, warnings, and inventory.
use super::context::MigrationContext;
use super::{record_failure, CommandStatus};
use crate::assess::credentials::MysqlCli;
use crate::assess::{run_assessment, AssessmentContext};
use crate::cli::AssessArgs;
use crate::paths::ArtifactPaths;
use crate::report::ReportSink;
use anyhow::Result;

pub fn run_assess(args: &AssessArgs) -> Result<CommandStatus> {
    let artifacts = ArtifactPaths::new(args.common.out.clone());
    let mut sink = ReportSink::start(
        artifacts.report_path(),
        artifacts.log_path(),
        "assessment",
        &args.config.display().to_string(),
    )?;
    let where_to_look = format!(
        "see {} and {}",
        artifacts.report_path().display(),
        sink.run_log().path().display()
    );
    let ctx = record_failure(
        &mut sink,
        MigrationContext::load(&args.config, &args.common.root, &args.common.out),
    )?;

    let client = MysqlCli::new(ctx.config.endpoint().clone());
    let log = sink.run_log().clone();
    let assessment = AssessmentContext {
        config: &ctx.config,
        repo: &ctx.repo,
        artifacts: &ctx.artifacts,
        log: &log,
        client: &client,
    };
    let result = match run_assessment(&assessment) {
        Ok(result) => result,
        Err(err) => {
            let message = format!("Assessment failed during checks: {err:#}");
            tracing::error!(error = %format!("{err:#}"), "assessment aborted");
            sink.log(&format!("ERROR: {message}"))?;
            sink.finish(false, &message)?;
            println!("ASSESSMENT: FAIL ({where_to_look})");
            return Ok(CommandStatus::AssessmentFailed);
        }
    };

    sink.set_source(result.source.clone())?;
    sink.set_target(result.target.clone())?;
    sink.set_gates(result.gates.clone())?;
    sink.set_warnings(result.warnings.clone())?;
    sink.set_inventory(result.inventory.clone())?;

    if !result.passed() {
        tracing::info!(failed = ?result.failed_gates(), "assessment gates failed");
        sink.finish(false, "Assessment failed: one or more hard gates failed.")?;
        println!("ASSESSMENT: FAIL ({where_to_look})");
        return Ok(CommandStatus::AssessmentFailed);
    }
    sink.finish(true, "Assessment passed. Ready to plan/run.")?;
    println!("ASSESSMENT: PASS ({where_to_look})");
    Ok(CommandStatus::Success)
}
