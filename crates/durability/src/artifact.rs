//! Snapshot artifacts in the export directory.
//!
//! An [`Artifact`] owns one uniquely named file and deletes it when dropped,
//! whichever way the request that allocated it ends. Files orphaned by a
//! crash are left to the reaper.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use dbexport_core::artifact_file_name;
use tracing::{debug, warn};

/// Attempts at finding an unused name before giving up.
const MAX_ALLOCATION_ATTEMPTS: usize = 4;

/// The directory artifacts are written to.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    /// Wrap an export directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The export directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if it is missing.
    ///
    /// Free space cannot be measured on a missing path.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Reserve a new empty artifact file for `database`.
    ///
    /// The file is created with `create_new`, so two requests can never end
    /// up sharing a path.
    pub fn allocate(&self, database: &str) -> io::Result<Artifact> {
        self.ensure()?;
        let mut last_err = None;
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let path = self.dir.join(artifact_file_name(database));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    debug!(path = %path.display(), "allocated artifact");
                    return Ok(Artifact { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)))
    }
}

/// A snapshot file owned by one export request.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the file in bytes.
    pub fn len(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        remove_if_present(&self.path);
    }
}

/// Delete `path`, treating "already gone" as success.
///
/// Returns `true` if this call removed the file.
pub fn remove_if_present(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed artifact");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove artifact");
            false
        }
    }
}
