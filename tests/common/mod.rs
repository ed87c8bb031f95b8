//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dbexport_core::{DatabaseHandle, StaticRegistry, ARTIFACT_PREFIX};
use dbexport_durability::ProcessSnapshotProducer;
use dbexport_security::{sign_actor, Actor, ActorAllowList, LinkAuthorizer, Signer};
use dbexport_server::ExportOrchestrator;
use rusqlite::Connection;
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";
pub const ROWS: usize = 1001;

/// Path of the built `dbexport` binary.
pub fn dbexport_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dbexport"))
}

/// Create a database with `rows` rows in table `big`.
pub fn seed_database(path: &Path, rows: usize) {
    let mut conn = Connection::open(path).unwrap();
    conn.execute_batch("create table big (id integer primary key, string text)")
        .unwrap();
    let tx = conn.transaction().unwrap();
    {
        let mut stmt = tx.prepare("insert into big (string) values (?1)").unwrap();
        for _ in 0..rows {
            stmt.execute(["12349871243987213948 ".repeat(10)]).unwrap();
        }
    }
    tx.commit().unwrap();
}

/// Rows in table `big`.
pub fn row_count(path: &Path) -> i64 {
    Connection::open(path)
        .unwrap()
        .query_row("select count(*) from big", [], |row| row.get(0))
        .unwrap()
}

/// Snapshot artifact names currently in `dir`.
pub fn artifact_names(dir: &Path) -> BTreeSet<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(ARTIFACT_PREFIX))
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

/// A seeded `data` database, an in-memory `memory` database, and an
/// export directory, wired to the real snapshot subprocess.
pub struct TestEnv {
    pub dir: TempDir,
    pub source: PathBuf,
    pub export_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.db");
        seed_database(&source, ROWS);
        let export_dir = dir.path().join("exports");
        std::fs::create_dir_all(&export_dir).unwrap();
        Self {
            dir,
            source,
            export_dir,
        }
    }

    pub fn signer(&self) -> Signer {
        Signer::new(SECRET)
    }

    pub fn root_cookie(&self) -> String {
        sign_actor(&self.signer(), &Actor::new("root"))
    }

    pub fn orchestrator(&self) -> ExportOrchestrator {
        self.orchestrator_with_max_age(None)
    }

    pub fn orchestrator_with_max_age(&self, max_age: Option<Duration>) -> ExportOrchestrator {
        let registry = StaticRegistry::with_databases([
            DatabaseHandle::on_disk("data", &self.source),
            DatabaseHandle::in_memory("memory"),
        ]);
        let authorizer = LinkAuthorizer::new(Arc::new(self.signer()), max_age);
        let producer = ProcessSnapshotProducer::new(dbexport_bin()).with_args(["snapshot"]);
        ExportOrchestrator::new(Arc::new(registry), authorizer, &self.export_dir)
            .with_permissions(Arc::new(ActorAllowList::new(["root"])))
            .with_producer(Arc::new(producer))
    }
}
