//! End-to-end `assess` with a scripted mysql client and precheck.
#![cfg(unix)]

mod common;

use common::{stderr, stdout, Kit};
use serde_json::{json, Value};

/// Fake client: accepts only password `p`; knows the `shop` schema.
const FAKE_MYSQL: &str = r#"
if [ "$MYSQL_PWD" != "p" ]; then
  echo "ERROR 1045 (28000): Access denied for user" >&2
  exit 1
fi
for arg in "$@"; do last="$arg"; done
case "$last" in
  "SELECT 1;") echo 1 ;;
  *"schema_name='shop'"*) echo 1 ;;
  *) echo 0 ;;
esac
"#;

fn kit_with_facts(innodb: &str) -> Kit {
    let kit = Kit::new();
    let mysql = kit.write_executable("bin/mysql", FAKE_MYSQL);
    kit.write_config(&format!(
        "client:\n  mysql_bin: '{}'\n  host: db.internal\n  port: 3307\nenv:\n  SRC_ADMIN_USER: admin\n  SRC_ADMIN_PASS: wrong\n  SRC_USER: mig\n  SRC_PASS: p\n  SRC_DB: shop\n",
        mysql.display()
    ));
    kit.write(
        "scripts/00_precheck.sh",
        &format!(
            "#!/usr/bin/env bash\nset -e\necho \"precheck as $USER on $HOST:$PORT\"\nprintf '8.0.35\\n' > \"$OUTDIR/mysql_version.tsv\"\nprintf '{innodb}\\n' > \"$OUTDIR/innodb_settings.tsv\"\nprintf 'STRICT_TRANS_TABLES\\n' > \"$OUTDIR/sql_mode.tsv\"\nprintf 'InnoDB\\t12\\n\\n' > \"$OUTDIR/engines_summary.tsv\"\necho \"$MYSQL_PWD\" > \"$OUTDIR/pwd_seen.txt\"\n"
        ),
    );
    kit
}

fn gate<'a>(report: &'a Value, name: &str) -> &'a Value {
    report["gates"]
        .as_array()
        .and_then(|gates| gates.iter().find(|gate| gate["name"] == name))
        .unwrap_or_else(|| panic!("gate {name} missing from {report}"))
}

#[test]
fn innodb_file_per_table_off_fails_the_assessment() {
    let kit = kit_with_facts("0\\t0");
    let output = kit.migctl(&["assess", "--config", "migration.yaml"]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ASSESSMENT: FAIL"));

    let report = kit.report();
    assert_eq!(report["mode"], "assessment");
    assert_eq!(report["success"], false);
    assert_eq!(
        report["message"],
        "Assessment failed: one or more hard gates failed."
    );
    let innodb = gate(&report, "innodb_file_per_table_is_1");
    assert_eq!(innodb["status"], "FAIL");
    assert_eq!(innodb["details"], json!({"value": "0"}));
    assert_eq!(gate(&report, "mysql_version_supported")["status"], "PASS");
    assert_eq!(gate(&report, "source_databases_exist")["status"], "PASS");
}

#[test]
fn passing_assessment_records_source_warnings_and_inventory() {
    let kit = kit_with_facts("1\\t1");
    let output = kit.migctl(&["assess", "-c", "migration.yaml"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ASSESSMENT: PASS"));

    let report = kit.report();
    assert_eq!(report["success"], true);
    assert_eq!(report["message"], "Assessment passed. Ready to plan/run.");
    assert_eq!(
        report["source"],
        json!({"type": "mysql", "version": "8.0.35", "host": "db.internal", "port": "3307"})
    );
    assert_eq!(report["target"], json!({"type": "mariadb", "version": "LTS"}));

    let dbs = gate(&report, "source_databases_exist");
    assert_eq!(
        dbs["details"],
        json!({"requested": ["shop"], "missing": [], "auth_source": "SRC_USER"})
    );

    let warnings: Vec<&str> = report["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .filter_map(|item| item["name"].as_str())
        .collect();
    assert_eq!(
        warnings,
        vec!["innodb_fast_shutdown_not_0", "sql_mode_review_recommended"]
    );
    assert_eq!(report["inventory"]["engines"], json!({"rows": ["InnoDB\t12"]}));
    assert_eq!(report["inventory"]["json_columns"], json!({"count": 0}));

    let log = kit.run_log();
    assert!(log.contains("Assessment source auth selected: SRC_USER (mig)"), "{log}");
    assert!(log.contains("OUT precheck as mig on db.internal:3307"), "{log}");
    assert!(!log.contains("wrong"), "passwords must not be logged: {log}");
    let pwd_seen = std::fs::read_to_string(kit.out().join("precheck/pwd_seen.txt"))
        .expect("precheck saw password");
    assert_eq!(pwd_seen.trim(), "p");
}

#[test]
fn failing_precheck_aborts_the_assessment() {
    let kit = kit_with_facts("1\\t0");
    kit.write("scripts/00_precheck.sh", "#!/usr/bin/env bash\necho 'cannot reach source' >&2\nexit 5\n");
    let output = kit.migctl(&["assess", "-c", "migration.yaml"]);
    assert_eq!(output.status.code(), Some(2));

    let report = kit.report();
    assert_eq!(report["success"], false);
    let message = report["message"].as_str().expect("message");
    assert!(
        message.starts_with("Assessment failed during checks: precheck failed rc=5"),
        "{message}"
    );
    assert_eq!(report["gates"], json!([]));
    assert!(kit.run_log().contains("OUT cannot reach source"));
}

#[test]
fn rejected_credentials_abort_with_the_last_candidate() {
    let kit = kit_with_facts("1\\t0");
    let output = kit.migctl_with_env(&["assess", "-c", "migration.yaml"], &[("SRC_PASS", "nope")]);
    assert_eq!(output.status.code(), Some(2));

    let message = kit.report()["message"].as_str().expect("message").to_string();
    assert!(
        message.contains("unable to authenticate to source for assessment: SRC_USER (mig) failed: ERROR 1045"),
        "{message}"
    );
    assert!(!kit.out().join("precheck/pwd_seen.txt").exists());
}
