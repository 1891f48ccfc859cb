//! Command workflows: assess, plan, run, and resume.
//!
//! Each command opens its own report, records configuration failures there
//! before returning them, and reports the outcome as a [`CommandStatus`] so
//! `main` can pick the exit code.
mod assess;
mod context;
mod plan;
mod run;
mod validate;

pub use assess::run_assess;
pub use plan::run_plan;
pub use run::{run_resume, run_run};

use crate::report::ReportSink;
use anyhow::Result;

/// How a command finished when it did not error out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    AssessmentFailed,
    RunFailed,
}

impl CommandStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::AssessmentFailed => 2,
            Self::RunFailed => 3,
        }
    }
}

/// Record `result`'s error in the report and log, then pass it through.
fn record_failure<T>(sink: &mut ReportSink, result: Result<T>) -> Result<T> {
    let err = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let message = format!("{err:#}");
    if let Err(log_err) = sink
        .log(&format!("ERROR: {message}"))
        .and_then(|()| sink.finish(false, &message))
    {
        tracing::warn!(error = %log_err, "record failure in report");
    }
    Err(err)
}
