//! Free-space check before committing to a snapshot.
//!
//! Advisory only: nothing is reserved, so two exports can both pass and one
//! can still fail while writing. That failure surfaces as a produce error.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dbexport_core::{ExportError, Result};
use tracing::debug;

/// Reports free bytes on the filesystem holding a directory.
pub trait FreeSpaceProbe: Send + Sync {
    /// Bytes available to this process under `dir`.
    fn available_space(&self, dir: &Path) -> io::Result<u64>;
}

/// Probe backed by `statvfs`/`GetDiskFreeSpaceEx` through `fs2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fs2Probe;

impl FreeSpaceProbe for Fs2Probe {
    fn available_space(&self, dir: &Path) -> io::Result<u64> {
        fs2::available_space(dir)
    }
}

/// Probe that always reports the same number of free bytes.
#[derive(Debug, Clone, Copy)]
pub struct FixedFreeSpace(pub u64);

impl FreeSpaceProbe for FixedFreeSpace {
    fn available_space(&self, _dir: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

/// Fails closed when the export directory cannot hold a copy of the source.
#[derive(Clone)]
pub struct CapacityGuard {
    probe: Arc<dyn FreeSpaceProbe>,
}

impl CapacityGuard {
    /// Guard using the given probe.
    pub fn new(probe: Arc<dyn FreeSpaceProbe>) -> Self {
        Self { probe }
    }

    /// Guard measuring the real filesystem.
    pub fn filesystem() -> Self {
        Self::new(Arc::new(Fs2Probe))
    }

    /// Check that `export_dir` has at least `required` free bytes.
    ///
    /// Returns the measured free space.
    ///
    /// # Errors
    ///
    /// [`ExportError::InsufficientSpace`] if free space is below `required`,
    /// [`ExportError::Io`] if the filesystem cannot be measured.
    pub fn check(&self, required: u64, export_dir: &Path) -> Result<u64> {
        let free = self.probe.available_space(export_dir)?;
        debug!(free, required, dir = %export_dir.display(), "capacity check");
        if free < required {
            return Err(ExportError::InsufficientSpace {
                export_dir: export_dir.to_path_buf(),
            });
        }
        Ok(free)
    }

    /// Stat `source` and check there is room for a copy, off the async executor.
    ///
    /// Returns the source size in bytes.
    pub async fn check_source(&self, source: &Path, export_dir: &Path) -> Result<u64> {
        let guard = self.clone();
        let source: PathBuf = source.to_path_buf();
        let export_dir: PathBuf = export_dir.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<u64> {
            let size = std::fs::metadata(&source)?.len();
            guard.check(size, &export_dir)?;
            Ok(size)
        })
        .await
        .map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

impl std::fmt::Debug for CapacityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityGuard").finish_non_exhaustive()
    }
}
