//! Tab-separated fact files written by the precheck script.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub type Row = Vec<String>;

/// Read a TSV fact file; a missing file is an empty fact set.
pub fn read_tsv(path: &Path) -> Result<Vec<Row>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path).with_context(|| format!("read facts {}", path.display()))?;
    Ok(parse_tsv(&String::from_utf8_lossy(&bytes)))
}

/// Split text into rows of fields, skipping blank and whitespace-only lines.
///
/// Only the line terminator is removed; field text is kept exactly.
pub fn parse_tsv(text: &str) -> Vec<Row> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Rows re-joined with tabs, as stored in report samples.
pub fn joined_rows(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|row| row.join("\t")).collect()
}

/// First field of the first row, or empty when there is none.
pub fn first_field(rows: &[Row]) -> &str {
    rows.first()
        .and_then(|row| row.first())
        .map(String::as_str)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_whitespace_lines_yield_no_rows() {
        assert!(parse_tsv("").is_empty());
        assert!(parse_tsv("\n   \n\t\n \t \r\n").is_empty());
    }

    #[test]
    fn three_columns_keep_order_and_exact_text() {
        let rows = parse_tsv("db1\t Users \tutf8mb4_0900_ai_ci\n");
        assert_eq!(rows, vec![vec!["db1", " Users ", "utf8mb4_0900_ai_ci"]]);
    }

    #[test]
    fn crlf_and_interleaved_blank_lines() {
        let rows = parse_tsv("a\tb\r\n\r\nc\td\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(joined_rows(&rows), vec!["a\tb", "c\td"]);
        assert_eq!(first_field(&rows), "a");
        assert_eq!(first_field(&[]), "");
    }

    #[test]
    fn missing_file_is_empty_and_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(read_tsv(&dir.path().join("absent.tsv"))
            .expect("read missing")
            .is_empty());

        let path = dir.path().join("latin1.tsv");
        fs::write(&path, b"caf\xe9\t1\n").expect("write facts");
        let rows = read_tsv(&path).expect("read facts");
        assert_eq!(rows, vec![vec!["caf\u{fffd}".to_string(), "1".to_string()]]);
    }
}
