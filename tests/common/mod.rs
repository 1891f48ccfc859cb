//! Shared test infrastructure for integration tests.
//!
//! A [`Kit`] is a throwaway migration-kit root (step map, scripts, config)
//! that `migctl` runs against with its working directory set to the root.
#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Variables that would otherwise leak from the developer's shell into runs.
const SCRUBBED_ENV: &[&str] = &[
    "SRC_HOST",
    "SRC_PORT",
    "SRC_USER",
    "SRC_PASS",
    "SRC_ADMIN_USER",
    "SRC_ADMIN_PASS",
    "SRC_ASSESS_USER",
    "SRC_ASSESS_PASS",
    "SRC_DB",
    "SRC_DBS",
    "TGT_HOST",
    "TGT_PORT",
    "TGT_USER",
    "TGT_PASS",
    "TGT_ADMIN_USER",
    "TGT_ADMIN_PASS",
    "MYSQL_PWD",
    "MYSQL_BIN",
    "ALLOW_ROOT_USERS",
    "NEAR_ZERO_REPLICATION_CMD",
    "NEAR_ZERO_CDC_CMD",
    "NEAR_ZERO_CUTOVER_CMD",
    "RUST_LOG",
];

pub struct Kit {
    dir: TempDir,
}

impl Default for Kit {
    fn default() -> Self {
        Self::new()
    }
}

impl Kit {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create kit dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn out(&self) -> PathBuf {
        self.root().join("artifacts")
    }

    /// Write a file relative to the kit root, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write kit file");
        path
    }

    /// Write a shell script with the executable bit set.
    pub fn write_executable(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.write(rel, &format!("#!/bin/sh\n{body}\n"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("chmod script");
        }
        path
    }

    pub fn write_step_map(&self, yaml: &str) {
        self.write("orchestrator/step_map.yaml", yaml);
    }

    pub fn write_config(&self, yaml: &str) -> PathBuf {
        self.write("migration.yaml", yaml)
    }

    /// Run `migctl` from the kit root with a scrubbed environment.
    pub fn migctl(&self, args: &[&str]) -> Output {
        self.migctl_with_env(args, &[])
    }

    pub fn migctl_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_migctl"));
        cmd.args(args).current_dir(self.root());
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        cmd.envs(env.iter().copied());
        cmd.output().expect("run migctl")
    }

    pub fn report(&self) -> Value {
        read_json(&self.out().join("report.json"))
    }

    pub fn state(&self) -> Value {
        read_json(&self.out().join("state.json"))
    }

    pub fn run_log(&self) -> String {
        fs::read_to_string(self.out().join("run.log")).expect("read run.log")
    }
}

pub fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|err| panic!("parse {}: {err}", path.display()))
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Step ids and statuses from a report's `steps` list.
pub fn step_statuses(report: &Value) -> Vec<(String, String)> {
    report["steps"]
        .as_array()
        .map(|steps| {
            steps
                .iter()
                .map(|step| {
                    (
                        step["id"].as_str().unwrap_or_default().to_string(),
                        step["status"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
