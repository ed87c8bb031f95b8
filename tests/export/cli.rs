//! The `dbexport` binary's own subcommands.

use std::process::Command;

use crate::common::*;

#[test]
fn test_snapshot_subcommand_copies_database() {
    let env = TestEnv::new();
    let dest = env.dir.path().join("copy.db");

    let output = Command::new(dbexport_bin())
        .arg("snapshot")
        .arg(&env.source)
        .arg(&dest)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(row_count(&dest), ROWS as i64);
}

#[test]
fn test_snapshot_subcommand_reports_sqlite_error() {
    let env = TestEnv::new();
    let dest = env.dir.path().join("copy.db");
    std::fs::write(&dest, b"already has content").unwrap();

    let output = Command::new(dbexport_bin())
        .arg("snapshot")
        .arg(&env.source)
        .arg(&dest)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).trim().is_empty());
}

#[test]
fn test_init_config_writes_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("dbexport.toml");

    let status = Command::new(dbexport_bin())
        .arg("init-config")
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(dbexport_core::ExportConfig::from_toml(&written).is_ok());

    std::fs::write(&path, "# edited\n").unwrap();
    let status = Command::new(dbexport_bin())
        .arg("init-config")
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");
}
