//! Typed paths into the artifact directory and the repo root.
//!
//! Centralizing path construction keeps every command reading and writing the
//! same files, which `resume` depends on.
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTDIR: &str = "artifacts";
const STATE_FILE: &str = "state.json";
const REPORT_FILE: &str = "report.json";
const LOG_FILE: &str = "run.log";
const PRECHECK_DIR: &str = "precheck";

/// Locations of durable run artifacts under an output directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    out: PathBuf,
}

impl ArtifactPaths {
    pub fn new(out: PathBuf) -> Self {
        Self { out }
    }

    /// Return the `state.json` ledger path.
    pub fn state_path(&self) -> PathBuf {
        self.out.join(STATE_FILE)
    }

    /// Return the `report.json` path.
    pub fn report_path(&self) -> PathBuf {
        self.out.join(REPORT_FILE)
    }

    /// Return the `run.log` path.
    pub fn log_path(&self) -> PathBuf {
        self.out.join(LOG_FILE)
    }

    /// Return the directory the precheck script writes its TSV facts into.
    pub fn precheck_dir(&self) -> PathBuf {
        self.out.join(PRECHECK_DIR)
    }
}

/// Locations of the scripts and step map that ship with the migration kit.
#[derive(Debug, Clone)]
pub struct RepoPaths {
    root: PathBuf,
}

impl RepoPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_step_map_path(&self) -> PathBuf {
        self.root.join("orchestrator").join("step_map.yaml")
    }

    pub fn precheck_script_rel(&self) -> &'static str {
        "scripts/00_precheck.sh"
    }

    pub fn checks_dir(&self) -> PathBuf {
        self.root.join("sql").join("checks")
    }
}
