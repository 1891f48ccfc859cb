//! Source credential selection with live authentication probes.
//!
//! Candidates are tried in priority order and the first one the source
//! accepts wins. Passwords are never logged; only the candidate label and
//! user name are.
use crate::config::{EffectiveConfig, SourceEndpoint};
use crate::util::truncate_string;
use std::collections::HashSet;
use std::process::Command;
use thiserror::Error;

/// Maximum characters of client error text carried in a failure.
pub const MAX_AUTH_ERROR_CHARS: usize = 240;
const PROBE_SQL: &str = "SELECT 1;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub password: String,
    /// Where the pair came from, e.g. `SRC_ADMIN_USER`.
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("mysql client not found: {0}")]
    ClientMissing(String),
    #[error("{label} ({user}) failed: {detail}")]
    Rejected {
        label: &'static str,
        user: String,
        detail: String,
    },
    #[error("no_source_credentials_available")]
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("mysql client not found: {0}")]
    ClientMissing(String),
    #[error("{0}")]
    Failed(String),
}

/// Read-only access to the source server.
pub trait SourceClient {
    /// Run `sql` as `user` and return stdout.
    fn query(&self, user: &str, password: &str, sql: &str) -> Result<String, QueryError>;
}

/// [`SourceClient`] backed by the `mysql` command-line client.
#[derive(Debug, Clone)]
pub struct MysqlCli {
    endpoint: SourceEndpoint,
}

impl MysqlCli {
    pub fn new(endpoint: SourceEndpoint) -> Self {
        Self { endpoint }
    }
}

impl SourceClient for MysqlCli {
    fn query(&self, user: &str, password: &str, sql: &str) -> Result<String, QueryError> {
        let bin = which::which(&self.endpoint.mysql_bin)
            .map_err(|_| QueryError::ClientMissing(self.endpoint.mysql_bin.clone()))?;
        let mut cmd = Command::new(bin);
        cmd.arg(format!("-h{}", self.endpoint.host))
            .arg(format!("-P{}", self.endpoint.port))
            .arg(format!("-u{user}"))
            .args(["--batch", "--skip-column-names", "-e", sql]);
        if password.is_empty() {
            cmd.env_remove("MYSQL_PWD");
        } else {
            cmd.env("MYSQL_PWD", password);
        }
        let output = cmd.output().map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                QueryError::ClientMissing(self.endpoint.mysql_bin.clone())
            }
            _ => QueryError::Failed(err.to_string()),
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(QueryError::Failed(text))
    }
}

/// Ordered, de-duplicated credential candidates.
///
/// Priority: assessment-only, admin, migration user, then `client.user` with
/// `MYSQL_PWD`. The first occurrence of a (user, password) pair wins.
pub fn candidates(config: &EffectiveConfig) -> Vec<Credential> {
    let mut raw = Vec::new();
    for (user_key, pass_key) in [
        ("SRC_ASSESS_USER", "SRC_ASSESS_PASS"),
        ("SRC_ADMIN_USER", "SRC_ADMIN_PASS"),
        ("SRC_USER", "SRC_PASS"),
    ] {
        let user = config.get_trimmed(user_key);
        if !user.is_empty() {
            raw.push(Credential {
                user,
                password: config.get_trimmed(pass_key),
                label: user_key,
            });
        }
    }
    if let Some(user) = config.static_user() {
        raw.push(Credential {
            user: user.to_string(),
            password: config.get_trimmed("MYSQL_PWD"),
            label: "client.user",
        });
    }
    dedupe(raw)
}

pub fn dedupe(candidates: Vec<Credential>) -> Vec<Credential> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|cred| seen.insert((cred.user.clone(), cred.password.clone())))
        .collect()
}

/// Probe candidates in order and return the first that authenticates.
pub fn select_credentials(
    candidates: &[Credential],
    client: &dyn SourceClient,
) -> Result<Credential, CredentialError> {
    let mut last_err = CredentialError::NoCandidates;
    for cred in candidates {
        match client.query(&cred.user, &cred.password, PROBE_SQL) {
            Ok(_) => {
                tracing::info!(label = cred.label, user = %cred.user, "source credentials accepted");
                return Ok(cred.clone());
            }
            Err(QueryError::ClientMissing(bin)) => return Err(CredentialError::ClientMissing(bin)),
            Err(QueryError::Failed(text)) => {
                tracing::debug!(label = cred.label, user = %cred.user, "source credentials rejected");
                last_err = CredentialError::Rejected {
                    label: cred.label,
                    user: cred.user.clone(),
                    detail: truncate_string(&text.replace('\n', " "), MAX_AUTH_ERROR_CHARS),
                };
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
