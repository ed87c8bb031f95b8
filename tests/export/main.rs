//! End-to-end tests for the export endpoint.
//!
//! Requests go through the actix service in-process; snapshots are made by
//! the real `dbexport snapshot` subprocess.

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod download;
mod rejection;
