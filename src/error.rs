//! Operator-facing configuration errors.
//!
//! These abort a command before any step runs. Everything else travels as a
//! plain `anyhow::Error`; `main` downcasts to this type to choose the exit code.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Missing step map: {}", .0.display())]
    StepMapNotFound(PathBuf),

    #[error("Unknown mode/playbook: {mode}. Available: {available}")]
    UnknownMode { mode: String, available: String },

    #[error("Mode '{mode}' references unknown phase: {phase}")]
    UnknownPhase { mode: String, phase: String },

    #[error("Missing required env vars for mode '{mode}': {}", .missing.join(", "))]
    MissingParameters { mode: String, missing: Vec<String> },

    #[error("Missing SRC_DB or SRC_DBS for {mode}.")]
    MissingSourceDatabases { mode: String },

    #[error(
        "SRC/TGT admin and migration users must not be root. Set ALLOW_ROOT_USERS=1 to override."
    )]
    RootUserRejected,

    #[error("Config path not provided and not found in {}", .0.display())]
    ResumeConfigUnknown(PathBuf),
}
