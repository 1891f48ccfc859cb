//! Read-only assessment of the source server.
//!
//! Runs the precheck script to collect TSV facts, then evaluates gates,
//! warnings, and inventory. Gate failures are data; only infrastructure
//! problems (authentication, missing or failing precheck) are errors.
pub mod credentials;
pub mod findings;
pub mod gates;
pub mod tsv;

use crate::config::EffectiveConfig;
use crate::paths::{ArtifactPaths, RepoPaths};
use crate::report::{Gate, RunLog, WarningItem};
use crate::runner::{run_step, StepEvent, StepInvocation};
use anyhow::{anyhow, bail, Context, Result};
use credentials::{Credential, SourceClient};
use findings::FactSet;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AssessmentResult {
    pub source: Value,
    pub target: Value,
    pub gates: Vec<Gate>,
    pub warnings: Vec<WarningItem>,
    pub inventory: BTreeMap<String, Value>,
}

impl AssessmentResult {
    pub fn passed(&self) -> bool {
        self.gates.iter().all(Gate::passed)
    }

    pub fn failed_gates(&self) -> Vec<&str> {
        self.gates
            .iter()
            .filter(|gate| !gate.passed())
            .map(|gate| gate.name.as_str())
            .collect()
    }
}

/// Everything an assessment reads from or writes to.
pub struct AssessmentContext<'a> {
    pub config: &'a EffectiveConfig,
    pub repo: &'a RepoPaths,
    pub artifacts: &'a ArtifactPaths,
    pub log: &'a RunLog,
    pub client: &'a dyn SourceClient,
}

pub fn run_assessment(ctx: &AssessmentContext<'_>) -> Result<AssessmentResult> {
    let candidates = credentials::candidates(ctx.config);
    let precheck_dir = run_precheck(ctx, &candidates)?;
    let facts = FactSet::load(&precheck_dir)?;

    let version = facts.version();
    let endpoint = ctx.config.endpoint();
    let source = json!({
        "type": "mysql",
        "version": version,
        "host": endpoint.host,
        "port": endpoint.port,
    });

    let (file_per_table, _) = facts.innodb();
    let gates = vec![
        gates::version_gate(&version),
        gates::innodb_file_per_table_gate(&file_per_table),
        gates::source_databases_gate(&ctx.config.source_databases(), &candidates, ctx.client),
    ];
    let (warnings, inventory) = findings::evaluate(&facts);
    tracing::info!(
        gates = gates.len(),
        warnings = warnings.len(),
        "assessment evaluated"
    );

    Ok(AssessmentResult {
        source,
        target: ctx.config.target().clone(),
        gates,
        warnings,
        inventory,
    })
}

/// Authenticate, then run the precheck script; returns the facts directory.
fn run_precheck(ctx: &AssessmentContext<'_>, candidates: &[Credential]) -> Result<PathBuf> {
    let precheck_dir = ctx.artifacts.precheck_dir();
    fs::create_dir_all(&precheck_dir)
        .with_context(|| format!("create {}", precheck_dir.display()))?;
    let precheck_dir = precheck_dir
        .canonicalize()
        .with_context(|| format!("resolve {}", precheck_dir.display()))?;
    let root = ctx
        .repo
        .root()
        .canonicalize()
        .with_context(|| format!("resolve repo root {}", ctx.repo.root().display()))?;

    let cred = credentials::select_credentials(candidates, ctx.client)
        .map_err(|err| anyhow!("unable to authenticate to source for assessment: {err}"))?;
    ctx.log.append(&format!(
        "Assessment source auth selected: {} ({})",
        cred.label, cred.user
    ))?;

    let endpoint = ctx.config.endpoint();
    let mut env = ctx.config.env().clone();
    env.insert("MYSQL_BIN".into(), endpoint.mysql_bin.clone());
    env.insert("HOST".into(), endpoint.host.clone());
    env.insert("PORT".into(), endpoint.port.clone());
    env.insert("USER".into(), cred.user.clone());
    env.insert("SRC_USER".into(), cred.user.clone());
    env.insert("OUTDIR".into(), precheck_dir.display().to_string());
    env.insert(
        "CHECKS_DIR".into(),
        RepoPaths::new(root.clone()).checks_dir().display().to_string(),
    );
    let mut env_remove: Vec<&str> = Vec::new();
    for key in ["MYSQL_PWD", "SRC_PASS"] {
        if cred.password.is_empty() {
            env.remove(key);
            env_remove.push(key);
        } else {
            env.insert(key.into(), cred.password.clone());
        }
    }

    let script_rel = ctx.repo.precheck_script_rel();
    let script = root.join(script_rel);
    if !script.exists() {
        bail!("Missing precheck script: {}", script.display());
    }
    ctx.log
        .append(&format!("RUN precheck -> {}", script.display()))?;

    let invocation = StepInvocation {
        root: &root,
        script: script_rel,
        args: &[],
        env: &env,
        env_remove: &env_remove,
        interpreter: Some("bash"),
    };
    let outcome = run_step(&invocation, &mut |event| match event {
        StepEvent::Command(line) => ctx.log.append_lossy(&format!("CMD {line}")),
        StepEvent::Output(line) => ctx.log.append_lossy(&format!("OUT {line}")),
    });
    if !outcome.success {
        if let Some(detail) = outcome.meta.get("detail").and_then(Value::as_str) {
            bail!("precheck could not start: {detail}");
        }
        let rc = outcome
            .meta
            .get("returncode")
            .map(Value::to_string)
            .unwrap_or_else(|| "null".to_string());
        bail!(
            "precheck failed rc={rc} (see {}/precheck.err)",
            precheck_dir.display()
        );
    }
    Ok(precheck_dir)
}
