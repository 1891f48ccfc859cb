//! Migration config loading and effective-configuration resolution.
//!
//! Precedence is resolved once per command: built-in defaults, then the YAML
//! config file, then a fixed allow-list of environment variables. Components
//! receive the resulting [`EffectiveConfig`] instead of reading the process
//! environment themselves.
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_MODE: &str = "offline";
const DEFAULT_MYSQL_BIN: &str = "mysql";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "3306";

/// Environment variables that may override config-file values.
pub const ENV_OVERRIDE_KEYS: &[&str] = &[
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
];

/// Raw migration config as written by the operator.
#[derive(Debug, Default, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub target: Option<serde_yaml::Value>,
}

/// Source client settings from the `client:` block.
#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub mysql_bin: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<serde_yaml::Value>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Resolved connection settings for the source client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint {
    pub mysql_bin: String,
    pub host: String,
    pub port: String,
}

/// Immutable configuration for a single command invocation.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    env: BTreeMap<String, String>,
    endpoint: SourceEndpoint,
    static_user: Option<String>,
    default_mode: Option<String>,
    target: Value,
}

/// Load the migration config YAML.
pub fn load_config(path: &Path) -> Result<MigrationConfig> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()).into());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(MigrationConfig::default());
    }
    let config: MigrationConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("parse config YAML {}", path.display()))?;
    Ok(config)
}

/// Snapshot the process environment for [`EffectiveConfig::resolve`].
pub fn process_env() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

impl EffectiveConfig {
    /// Layer defaults, config file, and allow-listed environment overrides.
    pub fn resolve(config: &MigrationConfig, environment: &BTreeMap<String, String>) -> Self {
        let mut env: BTreeMap<String, String> = config
            .env
            .iter()
            .filter_map(|(key, value)| yaml_scalar(value).map(|value| (key.clone(), value)))
            .collect();
        for key in ENV_OVERRIDE_KEYS {
            if let Some(value) = environment.get(*key).filter(|value| !value.is_empty()) {
                env.insert((*key).to_string(), value.clone());
            }
        }

        let client = &config.client;
        let endpoint = SourceEndpoint {
            mysql_bin: first_of(
                env.get("MYSQL_BIN").cloned(),
                client.mysql_bin.clone(),
                DEFAULT_MYSQL_BIN,
            ),
            host: first_of(env.get("SRC_HOST").cloned(), client.host.clone(), DEFAULT_HOST),
            port: first_of(
                env.get("SRC_PORT").cloned(),
                client.port.as_ref().and_then(yaml_scalar),
                DEFAULT_PORT,
            ),
        };

        let target = config
            .target
            .as_ref()
            .and_then(|value| serde_json::to_value(value).ok())
            .filter(|value| !value.is_null())
            .unwrap_or_else(|| json!({"type": "mariadb", "version": "LTS"}));

        Self {
            env,
            endpoint,
            static_user: client
                .user
                .as_ref()
                .map(|user| user.trim().to_string())
                .filter(|user| !user.is_empty()),
            default_mode: config.mode.clone(),
            target,
        }
    }

    /// Look up a variable, treating empty values as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Look up a variable, trimmed, returning an empty string when unset.
    pub fn get_trimmed(&self, key: &str) -> String {
        self.get(key).map(str::trim).unwrap_or_default().to_string()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn endpoint(&self) -> &SourceEndpoint {
        &self.endpoint
    }

    /// `client.user` from the config file, the lowest-priority credential.
    pub fn static_user(&self) -> Option<&str> {
        self.static_user.as_deref()
    }

    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Pick the execution mode: CLI flag, then config `mode`, then `offline`.
    pub fn resolve_mode(&self, cli_mode: Option<&str>) -> String {
        if let Some(mode) = cli_mode.map(str::trim).filter(|mode| !mode.is_empty()) {
            return mode.to_lowercase();
        }
        self.default_mode
            .as_deref()
            .map(str::trim)
            .filter(|mode| !mode.is_empty())
            .unwrap_or(DEFAULT_MODE)
            .to_lowercase()
    }

    /// Requested source databases: `SRC_DBS` (comma list) wins over `SRC_DB`.
    pub fn source_databases(&self) -> Vec<String> {
        let list = self.get_trimmed("SRC_DBS");
        if !list.is_empty() {
            return list
                .split(',')
                .map(str::trim)
                .filter(|db| !db.is_empty())
                .map(str::to_string)
                .collect();
        }
        let single = self.get_trimmed("SRC_DB");
        if single.is_empty() {
            Vec::new()
        } else {
            vec![single]
        }
    }
}

fn first_of(primary: Option<String>, secondary: Option<String>, default: &str) -> String {
    primary
        .filter(|value| !value.is_empty())
        .or(secondary.filter(|value| !value.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
