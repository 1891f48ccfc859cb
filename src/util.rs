use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

pub fn truncate_string(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Current UTC time as RFC 3339, the format every artifact timestamp uses.
pub fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format timestamp")
}

/// Compact UTC stamp (`20260101T120000Z`) used as a run identifier.
pub fn run_id_now() -> Result<String> {
    let format = format_description!("[year][month][day]T[hour][minute][second]Z");
    OffsetDateTime::now_utc()
        .format(&format)
        .context("format run id")
}

/// Replace `path` with pretty JSON via a sibling temp file and rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let text = serde_json::to_string_pretty(value).context("serialize JSON")?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("write {}", tmp.path().display()))?;
    publishable(&tmp)?;
    tmp.persist(path)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Temp files start owner-only; published artifacts are world-readable.
#[cfg(unix)]
fn publishable(tmp: &tempfile::NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(0o644))
        .with_context(|| format!("chmod {}", tmp.path().display()))
}

#[cfg(not(unix))]
fn publishable(_tmp: &tempfile::NamedTempFile) -> Result<()> {
    Ok(())
}
