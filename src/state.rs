//! Durable per-step completion ledger backing `resume`.
//!
//! Every operation re-reads `state.json` before acting, so a restarted
//! orchestrator always sees the last persisted status. One orchestrator per
//! output directory is assumed; no file locking is done.
use crate::util::{now_rfc3339, write_json_atomic};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    pub updated_at: String,
    #[serde(default)]
    pub meta: Value,
}

/// On-disk ledger document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    pub version: u32,
    pub created_at: String,
    #[serde(default)]
    pub steps: BTreeMap<String, StepRecord>,
}

#[derive(Debug, Clone)]
pub struct StateLedger {
    path: PathBuf,
}

impl StateLedger {
    /// Open the ledger, creating an empty one only if none exists yet.
    pub fn open(path: &Path) -> Result<Self> {
        let ledger = Self {
            path: path.to_path_buf(),
        };
        if !path.exists() {
            let empty = LedgerFile {
                version: STATE_SCHEMA_VERSION,
                created_at: now_rfc3339()?,
                steps: BTreeMap::new(),
            };
            ledger.write(&empty)?;
            tracing::debug!(path = %path.display(), "created state ledger");
        }
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only when the persisted record for `step_id` is DONE.
    pub fn is_done(&self, step_id: &str) -> Result<bool> {
        let ledger = self.read()?;
        Ok(ledger
            .steps
            .get(step_id)
            .is_some_and(|record| record.status == StepStatus::Done))
    }

    pub fn record(&self, step_id: &str) -> Result<Option<StepRecord>> {
        Ok(self.read()?.steps.remove(step_id))
    }

    pub fn mark_done(&self, step_id: &str, meta: Value) -> Result<()> {
        self.mark(step_id, StepStatus::Done, meta)
    }

    pub fn mark_failed(&self, step_id: &str, meta: Value) -> Result<()> {
        self.mark(step_id, StepStatus::Failed, meta)
    }

    fn mark(&self, step_id: &str, status: StepStatus, meta: Value) -> Result<()> {
        let mut ledger = self.read()?;
        let meta = if meta.is_null() {
            Value::Object(Default::default())
        } else {
            meta
        };
        ledger.steps.insert(
            step_id.to_string(),
            StepRecord {
                status,
                updated_at: now_rfc3339()?,
                meta,
            },
        );
        self.write(&ledger)
    }

    /// Read the ledger; a corrupt file is an error, never an empty ledger.
    pub fn read(&self) -> Result<LedgerFile> {
        let bytes =
            fs::read(&self.path).with_context(|| format!("read state {}", self.path.display()))?;
        let ledger: LedgerFile = serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "state ledger {} is corrupt; fix or remove it before resuming",
                self.path.display()
            )
        })?;
        if ledger.version != STATE_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported state ledger version {} in {}",
                ledger.version,
                self.path.display()
            ));
        }
        Ok(ledger)
    }

    fn write(&self, ledger: &LedgerFile) -> Result<()> {
        // Round-trip through Value so nested meta keys are sorted as well.
        let value = serde_json::to_value(ledger).context("serialize state ledger")?;
        write_json_atomic(&self.path, &value)
    }
}
