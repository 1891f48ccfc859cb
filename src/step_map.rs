//! Declarative step map: modes name phases, phases name ordered steps.
//!
//! The controller never executes the map directly; it flattens a mode into a
//! [`Plan`] first so the exact sequence can be recorded in the report.
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One externally-defined unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub script: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Step {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StepMap {
    #[serde(default)]
    pub modes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub phases: BTreeMap<String, Vec<Step>>,
}

/// A mode flattened into the ordered step sequence it will execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub mode: String,
    pub phases: Vec<String>,
    pub steps: Vec<Step>,
}

/// Load the step map YAML, reporting a missing file as a config error.
pub fn load_step_map(path: &Path) -> Result<StepMap> {
    if !path.exists() {
        return Err(ConfigError::StepMapNotFound(path.to_path_buf()).into());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("read step map {}", path.display()))?;
    parse_step_map(&text).with_context(|| format!("parse step map {}", path.display()))
}

pub fn parse_step_map(text: &str) -> Result<StepMap> {
    if text.trim().is_empty() {
        return Ok(StepMap::default());
    }
    let map: StepMap = serde_yaml::from_str(text)?;
    Ok(map)
}

impl StepMap {
    /// Expand `mode` into phases and steps in declared order.
    pub fn expand(&self, mode: &str) -> Result<Plan, ConfigError> {
        let phases = self
            .modes
            .get(mode)
            .ok_or_else(|| ConfigError::UnknownMode {
                mode: mode.to_string(),
                available: self.modes.keys().cloned().collect::<Vec<_>>().join(", "),
            })?;
        let mut steps = Vec::new();
        for phase in phases {
            let phase_steps = self
                .phases
                .get(phase)
                .ok_or_else(|| ConfigError::UnknownPhase {
                    mode: mode.to_string(),
                    phase: phase.clone(),
                })?;
            steps.extend(phase_steps.iter().cloned());
        }
        Ok(Plan {
            mode: mode.to_string(),
            phases: phases.clone(),
            steps,
        })
    }
}
