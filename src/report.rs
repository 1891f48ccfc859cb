//! Run report and plain-text run log.
//!
//! `report.json` is the structured record of one command invocation and is
//! rewritten after every mutation; `run.log` is an append-only, timestamped
//! transcript. Neither is ever reconstructed from the other.
use crate::step_map::Plan;
use crate::util::{now_rfc3339, run_id_now, write_json_atomic};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Outcome of one step as seen by a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepReportStatus {
    Done,
    Failed,
    Skipped,
}

/// Hard, binary pre-condition for proceeding with a migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    pub status: GateStatus,
    pub details: Value,
}

impl Gate {
    pub fn new(name: &str, status: GateStatus, details: Value) -> Self {
        Self {
            name: name.to_string(),
            status,
            details,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == GateStatus::Pass
    }
}

/// Non-blocking risk signal for operator review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningItem {
    pub name: String,
    pub severity: Severity,
    pub details: Value,
}

impl WarningItem {
    pub fn new(name: &str, severity: Severity, details: Value) -> Self {
        Self {
            name: name.to_string(),
            severity,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReportEntry {
    pub id: String,
    pub name: String,
    pub status: StepReportStatus,
    pub details: Value,
}

/// On-disk report document; field order is the JSON order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub run_id: String,
    pub mode: String,
    pub config_path: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub source: Value,
    pub target: Value,
    pub gates: Vec<Gate>,
    pub warnings: Vec<WarningItem>,
    pub inventory: BTreeMap<String, Value>,
    pub plan: Value,
    pub steps: Vec<StepReportEntry>,
}

/// Append-only, timestamped plain-text log.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let line = format!("{} {}\n", now_rfc3339()?, message);
        file.write_all(line.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Append without failing the caller; used from output callbacks.
    pub fn append_lossy(&self, message: &str) {
        if let Err(err) = self.append(message) {
            tracing::warn!(path = %self.path.display(), error = %err, "append run log failed");
        }
    }
}

/// Accumulates a [`RunReport`] and flushes it after every mutation.
#[derive(Debug)]
pub struct ReportSink {
    report_path: PathBuf,
    log: RunLog,
    data: RunReport,
}

impl ReportSink {
    /// Start a fresh report for `mode`, replacing any previous `report.json`.
    pub fn start(
        report_path: PathBuf,
        log_path: PathBuf,
        mode: &str,
        config_path: &str,
    ) -> Result<Self> {
        let data = RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            run_id: run_id_now()?,
            mode: mode.to_string(),
            config_path: config_path.to_string(),
            started_at: now_rfc3339()?,
            finished_at: None,
            success: None,
            message: None,
            source: Value::Object(Map::new()),
            target: Value::Object(Map::new()),
            gates: Vec::new(),
            warnings: Vec::new(),
            inventory: BTreeMap::new(),
            plan: Value::Object(Map::new()),
            steps: Vec::new(),
        };
        let sink = Self {
            report_path,
            log: RunLog::new(log_path),
            data,
        };
        sink.log(&format!("START mode={mode} config={config_path}"))?;
        sink.flush()?;
        Ok(sink)
    }

    pub fn run_log(&self) -> &RunLog {
        &self.log
    }

    pub fn log(&self, message: &str) -> Result<()> {
        self.log.append(message)
    }

    pub fn finish(&mut self, success: bool, message: &str) -> Result<()> {
        self.data.finished_at = Some(now_rfc3339()?);
        self.data.success = Some(success);
        self.data.message = Some(message.to_string());
        self.log(&format!("FINISH success={success} message={message}"))?;
        self.flush()
    }

    pub fn set_source(&mut self, source: Value) -> Result<()> {
        self.data.source = source;
        self.flush()
    }

    pub fn set_target(&mut self, target: Value) -> Result<()> {
        self.data.target = target;
        self.flush()
    }

    pub fn set_gates(&mut self, gates: Vec<Gate>) -> Result<()> {
        self.data.gates = gates;
        self.flush()
    }

    pub fn set_warnings(&mut self, warnings: Vec<WarningItem>) -> Result<()> {
        self.data.warnings = warnings;
        self.flush()
    }

    pub fn set_inventory(&mut self, inventory: BTreeMap<String, Value>) -> Result<()> {
        self.data.inventory = inventory;
        self.flush()
    }

    pub fn set_plan(&mut self, plan: &Plan) -> Result<()> {
        self.data.plan = serde_json::to_value(plan).context("serialize plan")?;
        self.flush()
    }

    pub fn add_step(
        &mut self,
        id: &str,
        name: &str,
        status: StepReportStatus,
        details: Value,
    ) -> Result<()> {
        let details = if details.is_null() {
            Value::Object(Map::new())
        } else {
            details
        };
        self.data.steps.push(StepReportEntry {
            id: id.to_string(),
            name: name.to_string(),
            status,
            details,
        });
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        write_json_atomic(&self.report_path, &self.data)
    }
}

/// Read a previously written report, e.g. to recover its `config_path`.
pub fn load_report(path: &Path) -> Result<RunReport> {
    let bytes = fs::read(path).with_context(|| format!("read report {}", path.display()))?;
    let report: RunReport = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse report {}", path.display()))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start(dir: &tempfile::TempDir) -> ReportSink {
        ReportSink::start(
            dir.path().join("report.json"),
            dir.path().join("run.log"),
            "run",
            "cfg.yaml",
        )
        .expect("start report")
    }

    fn on_disk(dir: &tempfile::TempDir) -> Value {
        let text = fs::read_to_string(dir.path().join("report.json")).expect("read report");
        serde_json::from_str(&text).expect("parse report")
    }

    #[test]
    fn start_writes_skeleton_report_and_log_line() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = start(&dir);
        let value = on_disk(&dir);
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["mode"], "run");
        assert_eq!(value["config_path"], "cfg.yaml");
        assert!(value["success"].is_null());
        assert_eq!(value["steps"], json!([]));
        let log = fs::read_to_string(sink.run_log().path()).expect("read log");
        assert!(log.trim_end().ends_with("START mode=run config=cfg.yaml"));
    }

    #[test]
    fn every_mutation_is_flushed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut sink = start(&dir);
        sink.set_gates(vec![Gate::new(
            "innodb_file_per_table_is_1",
            GateStatus::Fail,
            json!({"value": "0"}),
        )])
        .expect("set gates");
        assert_eq!(on_disk(&dir)["gates"][0]["status"], "FAIL");

        sink.add_step(
            "s1",
            "Step one",
            StepReportStatus::Skipped,
            json!({"reason": "already_done"}),
        )
        .expect("add step");
        let value = on_disk(&dir);
        assert_eq!(value["steps"][0]["status"], "SKIPPED");
        assert_eq!(value["steps"][0]["details"]["reason"], "already_done");

        sink.finish(false, "Run failed at step: s2").expect("finish");
        let value = on_disk(&dir);
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Run failed at step: s2");
        assert!(value["finished_at"].is_string());
    }

    #[test]
    fn log_is_append_only_across_sinks() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut first = start(&dir);
        first.finish(true, "done").expect("finish");
        let _second = start(&dir);
        let log = fs::read_to_string(dir.path().join("run.log")).expect("read log");
        let starts = log.lines().filter(|line| line.contains(" START ")).count();
        assert_eq!(starts, 2);
        assert!(log.contains("FINISH success=true message=done"));
    }

    #[test]
    fn load_report_recovers_config_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let _sink = start(&dir);
        let report = load_report(&dir.path().join("report.json")).expect("load report");
        assert_eq!(report.config_path, "cfg.yaml");
    }
}
