//! Consistent point-in-time copies of a SQLite database.
//!
//! The copy is made with `VACUUM INTO`, which reads the source inside a
//! single read transaction and so never captures a torn state, even while
//! other connections keep writing. The destination is bound as a statement
//! parameter and processes are started from an argument vector: no path is
//! ever interpolated into SQL or a shell command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dbexport_core::{ExportError, Result};
use rusqlite::{Connection, OpenFlags};
use tokio::process::Command;
use tracing::{debug, warn};

/// Subcommand of the `dbexport` binary that runs [`vacuum_into`].
pub const SNAPSHOT_SUBCOMMAND: &str = "snapshot";

/// Produces a consistent copy of `source` at `destination`.
///
/// `destination` already exists and is empty when this is called.
#[async_trait]
pub trait SnapshotProducer: Send + Sync {
    /// Write the snapshot.
    ///
    /// # Errors
    ///
    /// [`ExportError::Produce`] with diagnostic text on any failure.
    async fn produce(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// Copy `source` into `destination` with `VACUUM INTO`.
///
/// The source is opened read-only. `destination` must not exist or be empty
/// and must be valid UTF-8.
pub fn vacuum_into(source: &Path, destination: &Path) -> rusqlite::Result<()> {
    let conn = Connection::open_with_flags(
        source,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let destination = destination
        .to_str()
        .ok_or_else(|| rusqlite::Error::InvalidPath(destination.to_path_buf()))?;
    conn.execute("VACUUM INTO ?1", [destination])?;
    Ok(())
}

/// Runs the copy in a child process so a crash, hang, or runaway memory use
/// cannot take the server down with it.
///
/// The child is invoked as `<program> <args..> <source> <destination>`.
/// Its stdout and stderr are captured; stderr becomes the error text.
#[derive(Debug, Clone)]
pub struct ProcessSnapshotProducer {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ProcessSnapshotProducer {
    /// Producer running `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Producer that re-invokes the current executable's `snapshot` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).with_args([SNAPSHOT_SUBCOMMAND]))
    }

    /// Arguments placed before the source and destination paths.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the child and fail if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SnapshotProducer for ProcessSnapshotProducer {
    async fn produce(&self, source: &Path, destination: &Path) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(source)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), source = %source.display(), "starting snapshot process");
        let child = command.spawn().map_err(|e| {
            ExportError::produce(format!(
                "Failed to start snapshot process {}: {}",
                self.program.display(),
                e
            ))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(source = %source.display(), secs = limit.as_secs(), "snapshot process timed out");
                    return Err(ExportError::produce(format!(
                        "Snapshot timed out after {}s",
                        limit.as_secs()
                    )));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| {
            ExportError::produce(format!("Failed to wait for snapshot process: {}", e))
        })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("Snapshot process exited with {}", output.status)
        } else {
            stderr.into_owned()
        };
        Err(ExportError::produce(message))
    }
}

/// Runs [`vacuum_into`] on the blocking thread pool of this process.
///
/// Isolated from the request executor but not from the process; prefer
/// [`ProcessSnapshotProducer`] when a hung or crashing copy must be contained.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSnapshotProducer;

#[async_trait]
impl SnapshotProducer for InlineSnapshotProducer {
    async fn produce(&self, source: &Path, destination: &Path) -> Result<()> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || vacuum_into(&source, &destination))
            .await
            .map_err(|e| ExportError::produce(format!("Snapshot task failed: {}", e)))?
            .map_err(|e| ExportError::produce(e.to_string()))
    }
}
