//! Hard gates: any FAIL blocks the migration.
use super::credentials::{select_credentials, Credential, QueryError, SourceClient};
use crate::report::{Gate, GateStatus};
use serde_json::json;

pub const SUPPORTED_MYSQL_VERSIONS: &[&str] = &["5.7", "8.0", "8.4"];
const SOURCE_DATABASES_GATE: &str = "source_databases_exist";

fn status(pass: bool) -> GateStatus {
    if pass {
        GateStatus::Pass
    } else {
        GateStatus::Fail
    }
}

/// `mysql_version_supported`: major.minor of `version` must be allowed.
pub fn version_gate(version: &str) -> Gate {
    let version = version.trim();
    let major_minor = version.split('.').take(2).collect::<Vec<_>>().join(".");
    Gate::new(
        "mysql_version_supported",
        status(!version.is_empty() && SUPPORTED_MYSQL_VERSIONS.contains(&major_minor.as_str())),
        json!({"version": version, "allowed": SUPPORTED_MYSQL_VERSIONS}),
    )
}

/// `innodb_file_per_table_is_1`: the setting must read exactly `1`.
pub fn innodb_file_per_table_gate(value: &str) -> Gate {
    Gate::new(
        "innodb_file_per_table_is_1",
        status(value == "1"),
        json!({"value": value}),
    )
}

/// `source_databases_exist`: every requested database must exist on the source.
///
/// Authentication problems become a FAIL with the reason embedded instead of
/// an error, so the gate list stays complete.
pub fn source_databases_gate(
    requested: &[String],
    candidates: &[Credential],
    client: &dyn SourceClient,
) -> Gate {
    if requested.is_empty() {
        return Gate::new(
            SOURCE_DATABASES_GATE,
            GateStatus::Fail,
            json!({"reason": "SRC_DB_or_SRC_DBS_missing_for_assessment"}),
        );
    }
    let cred = match select_credentials(candidates, client) {
        Ok(cred) => cred,
        Err(err) => {
            return Gate::new(
                SOURCE_DATABASES_GATE,
                GateStatus::Fail,
                json!({
                    "requested": requested,
                    "missing": requested,
                    "reason": format!("source auth failed: {err}"),
                }),
            );
        }
    };

    let mut missing = Vec::new();
    for db in requested {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name='{}';",
            db.replace('\'', "''")
        );
        match client.query(&cred.user, &cred.password, &sql) {
            Ok(out) if out.trim() == "1" => {}
            Ok(_) | Err(QueryError::Failed(_)) => missing.push(db.clone()),
            Err(err @ QueryError::ClientMissing(_)) => {
                return Gate::new(
                    SOURCE_DATABASES_GATE,
                    GateStatus::Fail,
                    json!({
                        "requested": requested,
                        "missing": requested,
                        "reason": err.to_string(),
                    }),
                );
            }
        }
    }
    tracing::info!(requested = requested.len(), missing = missing.len(), "source databases checked");
    Gate::new(
        SOURCE_DATABASES_GATE,
        status(missing.is_empty()),
        json!({"requested": requested, "missing": missing, "auth_source": cred.label}),
    )
}
