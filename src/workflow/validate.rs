//! Per-mode required-parameter checks.
//!
//! These run before the ledger is opened or any step is spawned, so a missing
//! parameter never leaves partial state behind.
use crate::config::EffectiveConfig;
use crate::error::ConfigError;

const CONNECTION_KEYS: &[&str] = &[
    "SRC_HOST", "SRC_USER", "SRC_PASS", "TGT_HOST", "TGT_USER", "TGT_PASS",
];
const ADMIN_KEYS: &[&str] = &[
    "SRC_ADMIN_USER",
    "SRC_ADMIN_PASS",
    "TGT_ADMIN_USER",
    "TGT_ADMIN_PASS",
];
const ROOT_CHECKED_KEYS: &[&str] = &["SRC_USER", "TGT_USER", "SRC_ADMIN_USER", "TGT_ADMIN_USER"];
const NEAR_ZERO_KEYS: &[&str] = &[
    "NEAR_ZERO_REPLICATION_CMD",
    "NEAR_ZERO_CDC_CMD",
    "NEAR_ZERO_CUTOVER_CMD",
];
const ALLOW_ROOT_VALUES: &[&str] = &["1", "true", "TRUE", "True"];

/// Check that `mode` has everything it needs in the effective config.
pub fn validate_required_parameters(
    mode: &str,
    config: &EffectiveConfig,
) -> Result<(), ConfigError> {
    match mode {
        "one_step" | "two_step" => {
            require(mode, config, CONNECTION_KEYS)?;
            require(mode, config, ADMIN_KEYS)?;
            if config.get("SRC_DB").is_none() && config.get("SRC_DBS").is_none() {
                return Err(ConfigError::MissingSourceDatabases {
                    mode: mode.to_string(),
                });
            }
            let allow_root = config
                .get("ALLOW_ROOT_USERS")
                .is_some_and(|value| ALLOW_ROOT_VALUES.contains(&value));
            if !allow_root
                && ROOT_CHECKED_KEYS
                    .iter()
                    .any(|key| config.get(key) == Some("root"))
            {
                return Err(ConfigError::RootUserRejected);
            }
            Ok(())
        }
        "near_zero" => require(mode, config, NEAR_ZERO_KEYS),
        _ => Ok(()),
    }
}

/// Report every missing key of one group together.
fn require(mode: &str, config: &EffectiveConfig, keys: &[&str]) -> Result<(), ConfigError> {
    let missing: Vec<String> = keys
        .iter()
        .filter(|key| config.get(key).is_none())
        .map(|key| key.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingParameters {
            mode: mode.to_string(),
            missing,
        })
    }
}
