use super::*;

fn parse(yaml: &str) -> MigrationConfig {
    serde_yaml::from_str(yaml).expect("parse config yaml")
}

fn environment(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn defaults_apply_when_config_and_environment_are_empty() {
    let effective = EffectiveConfig::resolve(&MigrationConfig::default(), &BTreeMap::new());
    assert_eq!(
        effective.endpoint(),
        &SourceEndpoint {
            mysql_bin: "mysql".to_string(),
            host: "127.0.0.1".to_string(),
            port: "3306".to_string(),
        }
    );
    assert_eq!(effective.resolve_mode(None), "offline");
    assert_eq!(effective.target()["type"], "mariadb");
}

#[test]
fn file_values_override_defaults_and_scalars_are_stringified() {
    let config = parse(
        "mode: Staged\nenv:\n  SRC_PORT: 3307\n  ALLOW_ROOT_USERS: true\nclient:\n  host: db.internal\n  port: 3310\n  user: ' reader '\ntarget:\n  type: mariadb\n  version: '11.4'\n",
    );
    let effective = EffectiveConfig::resolve(&config, &BTreeMap::new());
    assert_eq!(effective.get("ALLOW_ROOT_USERS"), Some("true"));
    assert_eq!(effective.endpoint().host, "db.internal");
    // env.SRC_PORT outranks client.port.
    assert_eq!(effective.endpoint().port, "3307");
    assert_eq!(effective.static_user(), Some("reader"));
    assert_eq!(effective.resolve_mode(None), "staged");
    assert_eq!(effective.target()["version"], "11.4");
}

#[test]
fn allow_listed_environment_wins_only_when_non_empty() {
    let config = parse("env:\n  SRC_HOST: from-file\n  SRC_USER: file-user\n  CUSTOM: keep\n");
    let env = environment(&[
        ("SRC_HOST", "from-env"),
        ("SRC_USER", ""),
        ("CUSTOM", "ignored"),
    ]);
    let effective = EffectiveConfig::resolve(&config, &env);
    assert_eq!(effective.get("SRC_HOST"), Some("from-env"));
    assert_eq!(effective.get("SRC_USER"), Some("file-user"));
    assert_eq!(effective.get("CUSTOM"), Some("keep"));
    assert_eq!(effective.endpoint().host, "from-env");
}

#[test]
fn cli_mode_is_trimmed_and_lowercased() {
    let effective = EffectiveConfig::resolve(&parse("mode: offline\n"), &BTreeMap::new());
    assert_eq!(effective.resolve_mode(Some("  Near_Zero ")), "near_zero");
}

#[test]
fn source_database_list_wins_over_single_database() {
    let config = parse("env:\n  SRC_DB: single\n  SRC_DBS: ' a, ,b ,'\n");
    let effective = EffectiveConfig::resolve(&config, &BTreeMap::new());
    assert_eq!(effective.source_databases(), vec!["a", "b"]);

    let config = parse("env:\n  SRC_DB: ' single '\n");
    let effective = EffectiveConfig::resolve(&config, &BTreeMap::new());
    assert_eq!(effective.source_databases(), vec!["single"]);

    let effective = EffectiveConfig::resolve(&MigrationConfig::default(), &BTreeMap::new());
    assert!(effective.source_databases().is_empty());
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = load_config(&dir.path().join("absent.yaml")).expect_err("missing config");
    assert!(err.downcast_ref::<ConfigError>().is_some());
}

#[test]
fn empty_config_file_loads_as_default() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.yaml");
    std::fs::write(&path, "\n").expect("write config");
    let config = load_config(&path).expect("load empty config");
    assert!(config.env.is_empty());
}
