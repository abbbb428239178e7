//! Configuration files.

use std::io::Write;
use std::path::PathBuf;

use oxide_audit::config::{AdvisorConfig, AuditConfig, Dsn};
use oxide_audit::prelude::*;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"{
    "dsn": {"host": "db.local", "user": "audit", "database": "shop"},
    "rules": [
        {"name": "ddl_check_pk_not_exist", "level": "error"},
        {"name": "dml_rollback_max_rows", "level": "notice", "value": "500"},
        {"name": "ddl_gh_ost_min_size", "value": "2048"}
    ],
    "advisor": {"min_selectivity": 0.2},
    "gh_ost": {"binary": "/opt/gh-ost"}
}"#;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file() {
    let file = write_config(CONFIG);
    let config = AuditConfig::from_file(file.path()).unwrap();

    let dsn = config.dsn.as_ref().unwrap();
    assert_eq!(dsn, &Dsn::new("db.local", 3306, "audit").database("shop"));
    assert_eq!(config.rules.len(), 3);
    assert_eq!(config.rules[2].level, RuleLevel::Normal);
    assert_eq!(
        config.advisor,
        AdvisorConfig {
            min_selectivity: 0.2,
            ..AdvisorConfig::default()
        }
    );
    let gh_ost = config.gh_ost.as_ref().unwrap();
    assert_eq!(gh_ost.binary, PathBuf::from("/opt/gh-ost"));
    assert!(gh_ost.extra_args.is_empty());
}

#[test]
fn test_session_from_config() {
    let config = AuditConfig::from_json(CONFIG).unwrap();
    let auditor = Auditor::from_config(&config);
    assert!(!auditor.is_offline());
    assert_eq!(auditor.catalog().current_schema(), "shop");
    let limits = auditor.limits();
    assert_eq!(limits.dml_rollback_max_rows, 500);
    assert_eq!(limits.ddl_gh_ost_min_size, 2048);
    assert_eq!(limits.ddl_osc_min_size, -1);

    let mut offline = Auditor::from_config(&AuditConfig {
        dsn: None,
        ..config
    });
    assert!(offline.is_offline());
    let result = offline.audit("CREATE TABLE t (id INT)").unwrap();
    assert_eq!(result.level(), RuleLevel::Error);
}

#[test]
fn test_round_trip_keeps_password_out_of_debug() {
    let mut config = AuditConfig::from_json(CONFIG).unwrap();
    if let Some(dsn) = config.dsn.as_mut() {
        dsn.password = String::from("s3cret");
    }
    assert!(!format!("{config:?}").contains("s3cret"));

    let file = write_config(&config.to_json().unwrap());
    assert_eq!(AuditConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_invalid_files() {
    let file = write_config("{\"rules\": [{\"level\": \"error\"}]}");
    assert!(matches!(
        AuditConfig::from_file(file.path()),
        Err(AuditError::Serialization(_))
    ));

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        AuditConfig::from_file(missing),
        Err(AuditError::Io(_))
    ));
}
