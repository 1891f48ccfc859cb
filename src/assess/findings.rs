//! Precheck facts, soft warnings, and the descriptive inventory.
use super::tsv::{first_field, joined_rows, read_tsv, Row};
use crate::report::{Severity, WarningItem};
use anyhow::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Rows kept in warning samples and inventory listings.
pub const SAMPLE_ROWS: usize = 200;

/// Parsed contents of the precheck output directory.
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    pub mysql_version: Vec<Row>,
    pub innodb_settings: Vec<Row>,
    pub auth_plugins: Vec<Row>,
    pub json_columns: Vec<Row>,
    pub compression_encryption: Vec<Row>,
    pub engines: Vec<Row>,
    pub schema_sizes: Vec<Row>,
    pub schema_charsets: Vec<Row>,
    pub table_collations: Vec<Row>,
    pub column_collations: Vec<Row>,
    pub sql_mode: Vec<Row>,
    pub definers: Vec<Row>,
    pub partitioned_tables: Vec<Row>,
    pub active_plugins: Vec<Row>,
}

impl FactSet {
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |name: &str| read_tsv(&dir.join(name));
        Ok(Self {
            mysql_version: read("mysql_version.tsv")?,
            innodb_settings: read("innodb_settings.tsv")?,
            auth_plugins: read("auth_plugins.tsv")?,
            json_columns: read("json_columns.tsv")?,
            compression_encryption: read("compression_encryption.tsv")?,
            engines: read("engines_summary.tsv")?,
            schema_sizes: read("schema_sizes.tsv")?,
            schema_charsets: read("schema_charsets.tsv")?,
            table_collations: read("mysql8_collations.tsv")?,
            column_collations: read("mysql8_column_collations.tsv")?,
            sql_mode: read("sql_mode.tsv")?,
            definers: read("definers_inventory.tsv")?,
            partitioned_tables: read("partitioned_tables.tsv")?,
            active_plugins: read("active_plugins.tsv")?,
        })
    }

    pub fn version(&self) -> String {
        first_field(&self.mysql_version).trim().to_string()
    }

    /// `(file_per_table, fast_shutdown)`; both empty unless the row has two columns.
    pub fn innodb(&self) -> (String, String) {
        match self.innodb_settings.first() {
            Some(row) if row.len() >= 2 => (row[0].trim().to_string(), row[1].trim().to_string()),
            _ => (String::new(), String::new()),
        }
    }

    pub fn sql_mode(&self) -> &str {
        first_field(&self.sql_mode)
    }
}

/// Warnings and inventory derived from `facts`, in report order.
pub fn evaluate(facts: &FactSet) -> (Vec<WarningItem>, BTreeMap<String, Value>) {
    let mut warnings = Vec::new();
    let mut inventory = BTreeMap::new();

    let (_, fast_shutdown) = facts.innodb();
    if !fast_shutdown.is_empty() && fast_shutdown != "0" {
        warnings.push(WarningItem::new(
            "innodb_fast_shutdown_not_0",
            Severity::Medium,
            json!({"value": fast_shutdown, "required_before_shutdown": 0}),
        ));
    }

    let counted: [(&[Row], &str, Severity, &str); 3] = [
        (
            &facts.auth_plugins,
            "mysql_sha_or_caching_auth_users",
            Severity::High,
            "auth_plugin_users",
        ),
        (&facts.json_columns, "json_columns_present", Severity::Medium, "json_columns"),
        (
            &facts.compression_encryption,
            "encryption_or_compression_detected",
            Severity::High,
            "encryption_or_compression",
        ),
    ];
    for (rows, warning, severity, key) in counted {
        let count = count_warning(rows, warning, severity, &mut warnings);
        inventory.insert(key.to_string(), json!({"count": count}));
    }

    inventory.insert("engines".to_string(), rows_entry(&facts.engines));
    inventory.insert("schema_sizes_mb".to_string(), rows_entry(&facts.schema_sizes));
    inventory.insert("schema_charsets".to_string(), rows_entry(&facts.schema_charsets));

    for (rows, warning, key) in [
        (
            &facts.table_collations,
            "mysql8_table_collations_present",
            "mysql8_table_collations",
        ),
        (
            &facts.column_collations,
            "mysql8_column_collations_present",
            "mysql8_column_collations",
        ),
    ] {
        let count = count_warning(rows, warning, Severity::Medium, &mut warnings);
        inventory.insert(key.to_string(), json!({"count": count}));
    }

    let sql_mode = facts.sql_mode();
    if !sql_mode.is_empty() {
        warnings.push(WarningItem::new(
            "sql_mode_review_recommended",
            Severity::Medium,
            json!({"value": sql_mode}),
        ));
    }
    inventory.insert("sql_mode".to_string(), json!({"value": sql_mode}));

    for (rows, warning, key) in [
        (&facts.definers, "definer_objects_present", "definers"),
        (
            &facts.partitioned_tables,
            "partitioned_tables_present",
            "partitioned_tables",
        ),
    ] {
        let count = count_warning(rows, warning, Severity::Medium, &mut warnings);
        inventory.insert(key.to_string(), json!({"count": count}));
    }

    count_warning(
        &facts.active_plugins,
        "active_plugins_review_recommended",
        Severity::Low,
        &mut warnings,
    );
    inventory.insert("active_plugins".to_string(), rows_entry(&facts.active_plugins));

    (warnings, inventory)
}

/// Push a `{count, rows_sample}` warning when `rows` is non-empty; return the count.
fn count_warning(
    rows: &[Row],
    name: &str,
    severity: Severity,
    warnings: &mut Vec<WarningItem>,
) -> usize {
    let lines = joined_rows(rows);
    if !lines.is_empty() {
        warnings.push(WarningItem::new(
            name,
            severity,
            json!({"count": lines.len(), "rows_sample": sample(&lines)}),
        ));
    }
    lines.len()
}

fn rows_entry(rows: &[Row]) -> Value {
    json!({"rows": sample(&joined_rows(rows))})
}

fn sample(lines: &[String]) -> &[String] {
    &lines[..lines.len().min(SAMPLE_ROWS)]
}
