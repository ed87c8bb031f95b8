//! Disk-side machinery for dbexport: everything that touches the export
//! directory or the source database file.
//!
//! - [`capacity`]: free-space check before a copy is attempted
//! - [`snapshot`]: consistent copies via `VACUUM INTO`, in a child process or inline
//! - [`artifact`]: uniquely named scratch files deleted on drop
//! - [`reaper`]: periodic removal of artifacts orphaned by crashes

#![warn(missing_docs)]

pub mod artifact;
pub mod capacity;
pub mod reaper;
pub mod snapshot;

pub use artifact::{remove_if_present, Artifact, ArtifactDir};
pub use capacity::{CapacityGuard, FixedFreeSpace, FreeSpaceProbe, Fs2Probe};
pub use reaper::{sweep, sweep_at, ReaperHandle, SweepReport, TempFileReaper};
pub use snapshot::{
    vacuum_into, InlineSnapshotProducer, ProcessSnapshotProducer, SnapshotProducer,
    SNAPSHOT_SUBCOMMAND,
};
pub use tokio_util::sync::CancellationToken;
