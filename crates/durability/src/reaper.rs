//! Background deletion of orphaned snapshot artifacts.
//!
//! Requests delete their own artifacts; this sweep only catches files left
//! behind by a crash or a killed process. Age is measured from the last
//! modification time, since creation time is not available everywhere.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbexport_durability::TempFileReaper;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let reaper = TempFileReaper::new(
//!     std::env::temp_dir(),
//!     Duration::from_secs(3600),
//!     Duration::from_secs(3600),
//! );
//!
//! // Run one sweep directly
//! let report = reaper.sweep_once().await.unwrap();
//!
//! // Or sweep now and then every interval until cancelled
//! let handle = reaper.spawn(CancellationToken::new());
//! handle.shutdown().await;
//! # }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use dbexport_core::{is_artifact_name, ReaperConfig};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Artifact files examined
    pub scanned: usize,
    /// Files this sweep deleted
    pub removed: usize,
    /// Files that disappeared before they could be examined or deleted
    pub vanished: usize,
    /// Files that could not be examined or deleted
    pub failed: usize,
}

/// Delete artifacts in `dir` whose mtime is older than `retention`.
pub fn sweep(dir: &Path, retention: Duration) -> io::Result<SweepReport> {
    sweep_at(dir, retention, SystemTime::now())
}

/// [`sweep`] measured against an explicit clock.
///
/// A missing directory is an empty sweep. Only files carrying the artifact
/// prefix are considered; a file removed by someone else mid-sweep is
/// counted as vanished, not as a failure.
pub fn sweep_at(dir: &Path, retention: Duration, now: SystemTime) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "failed to read export directory entry");
                report.failed += 1;
                continue;
            }
        };
        let name = entry.file_name();
        if !name.to_str().map_or(false, is_artifact_name) {
            continue;
        }

        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.vanished += 1;
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat artifact");
                report.failed += 1;
                continue;
            }
        };
        report.scanned += 1;

        // mtime in the future counts as brand new
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= retention {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), age_secs = age.as_secs(), "reaped orphaned artifact");
                report.removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => report.vanished += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to reap artifact");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Periodic sweep of one export directory.
#[derive(Debug, Clone)]
pub struct TempFileReaper {
    dir: PathBuf,
    interval: Duration,
    retention: Duration,
}

impl TempFileReaper {
    /// Create a reaper for `dir`.
    pub fn new(dir: impl Into<PathBuf>, interval: Duration, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            retention,
        }
    }

    /// Create a reaper from the `[reaper]` config section.
    pub fn from_config(dir: impl Into<PathBuf>, config: &ReaperConfig) -> Self {
        Self::new(dir, config.interval(), config.retention())
    }

    /// The directory being swept.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run one sweep on the blocking pool, away from request handling.
    pub async fn sweep_once(&self) -> io::Result<SweepReport> {
        let dir = self.dir.clone();
        let retention = self.retention;
        tokio::task::spawn_blocking(move || sweep(&dir, retention))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    /// Sweep immediately, then once per interval, until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> ReaperHandle {
        let task_token = token.clone();
        let handle = tokio::spawn(async move { self.run(task_token).await });
        ReaperHandle { token, handle }
    }

    async fn run(self, token: CancellationToken) {
        // The first tick completes immediately, clearing leftovers from a previous run.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(dir = %self.dir.display(), "reaper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) => debug!(
                            dir = %self.dir.display(),
                            scanned = report.scanned,
                            removed = report.removed,
                            "reaper sweep finished"
                        ),
                        Err(e) => error!(dir = %self.dir.display(), error = %e, "reaper sweep failed"),
                    }
                }
            }
        }
    }
}

/// Handle to a running reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReaperHandle {
    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the reaper and wait for the task to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "reaper task panicked");
        }
    }
}
