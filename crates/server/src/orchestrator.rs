//! Request flow for one export.
//!
//! ```text
//! resolve -> authorize -> acquire permit -> capacity -> allocate -> produce -> stream
//! ```
//!
//! Every step up to produce can fail with an [`ExportError`]. Anything
//! acquired along the way (the permit, the artifact file) is owned by a
//! local or by the returned [`PreparedExport`], so an early return or a
//! dropped response releases it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use dbexport_core::{
    download_file_name, format_size, DatabaseHandle, DatabaseRegistry, ExportConfig, ExportError,
    Result, StaticRegistry,
};
use dbexport_durability::{
    Artifact, ArtifactDir, CapacityGuard, InlineSnapshotProducer, ProcessSnapshotProducer,
    SnapshotProducer,
};
use dbexport_security::{
    Actor, ActorAllowList, DenyAll, ExportClaims, LinkAuthorizer, PermissionPolicy, Signer,
    EXPORT_ACTION,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::stream::ArtifactStream;

/// Label of the export link.
pub const EXPORT_LABEL: &str = "Export this database";

/// Default cap on simultaneous exports.
pub const DEFAULT_MAX_CONCURRENT_EXPORTS: usize = 4;

/// A link rendered on a database page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseAction {
    pub href: String,
    pub label: String,
    pub description: String,
}

/// Characters escaped when a database name is used as a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Path of the export endpoint for `database`, with the name percent-encoded.
pub fn export_path(database: &str) -> String {
    format!(
        "/{}/-/export-database",
        utf8_percent_encode(database, PATH_SEGMENT)
    )
}

/// Coordinates the guards, the producer, and the artifact directory.
pub struct ExportOrchestrator {
    registry: Arc<dyn DatabaseRegistry>,
    authorizer: LinkAuthorizer,
    permissions: Arc<dyn PermissionPolicy>,
    capacity: CapacityGuard,
    producer: Arc<dyn SnapshotProducer>,
    artifacts: ArtifactDir,
    limiter: Arc<Semaphore>,
}

impl ExportOrchestrator {
    /// Orchestrator with filesystem capacity checks, inline snapshots, no
    /// permissions granted, and the default concurrency cap.
    pub fn new(
        registry: Arc<dyn DatabaseRegistry>,
        authorizer: LinkAuthorizer,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            authorizer,
            permissions: Arc::new(DenyAll),
            capacity: CapacityGuard::filesystem(),
            producer: Arc::new(InlineSnapshotProducer),
            artifacts: ArtifactDir::new(export_dir),
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_EXPORTS)),
        }
    }

    /// Build everything from a loaded config.
    ///
    /// Snapshots run in a child process of the current executable.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let signer = match &config.secret {
            Some(secret) => Signer::new(secret),
            None => Signer::random(),
        };
        let authorizer = LinkAuthorizer::new(Arc::new(signer), config.token_max_age());
        let registry = StaticRegistry::with_databases(config.database_handles());
        let producer =
            ProcessSnapshotProducer::current_exe()?.with_timeout(config.snapshot_timeout());

        Ok(Self::new(Arc::new(registry), authorizer, config.export_dir())
            .with_permissions(Arc::new(ActorAllowList::new(config.export_actors.iter())))
            .with_producer(Arc::new(producer))
            .with_max_concurrent(config.max_concurrent_exports))
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionPolicy>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_capacity(mut self, capacity: CapacityGuard) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_producer(mut self, producer: Arc<dyn SnapshotProducer>) -> Self {
        self.producer = producer;
        self
    }

    /// Cap simultaneous exports. Zero is treated as one.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.limiter = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn registry(&self) -> &Arc<dyn DatabaseRegistry> {
        &self.registry
    }

    pub fn authorizer(&self) -> &LinkAuthorizer {
        &self.authorizer
    }

    pub fn signer(&self) -> &Signer {
        self.authorizer.signer()
    }

    pub fn artifacts(&self) -> &ArtifactDir {
        &self.artifacts
    }

    /// Exports that could start right now.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    fn resolve(&self, database: &str) -> Result<(DatabaseHandle, PathBuf)> {
        let handle = self
            .registry
            .get(database)
            .ok_or_else(|| ExportError::DatabaseNotFound {
                name: database.to_string(),
            })?;
        let path = handle
            .path()
            .map(|p| p.to_path_buf())
            .ok_or(ExportError::NotExportable)?;
        Ok((handle, path))
    }

    /// Run every check and produce the snapshot.
    ///
    /// On success the returned [`PreparedExport`] holds a complete snapshot
    /// on disk. On failure nothing is left behind.
    pub async fn prepare(
        &self,
        database: &str,
        token: &str,
        session_csrf: &str,
    ) -> Result<PreparedExport> {
        let (handle, source) = self.resolve(database)?;
        let claims = self
            .authorizer
            .authorize(token, handle.name(), session_csrf)
            .map_err(|e| {
                debug!(database, error = %e, "export token rejected");
                e
            })?;

        let permit = Arc::clone(&self.limiter)
            .try_acquire_owned()
            .map_err(|_| ExportError::Busy)?;

        self.artifacts.ensure()?;
        let source_size = self
            .capacity
            .check_source(&source, self.artifacts.path())
            .await?;

        let artifact = self.artifacts.allocate(handle.name())?;
        if let Err(e) = self.producer.produce(&source, artifact.path()).await {
            warn!(database, error = %e, "snapshot failed");
            return Err(e);
        }
        let size = artifact.len()?;
        info!(database, source_size, size, "snapshot ready");

        Ok(PreparedExport {
            artifact,
            _permit: permit,
            download_name: download_file_name(handle.name(), Utc::now()),
            size,
            claims,
        })
    }

    /// Links to show on the page for `database`.
    ///
    /// Empty unless `actor` may export and the database lives in a file.
    pub async fn database_actions(
        &self,
        actor: Option<&Actor>,
        database: &str,
        csrf: &str,
    ) -> Vec<DatabaseAction> {
        if !self.permissions.allows(EXPORT_ACTION, actor, database) {
            return Vec::new();
        }
        let Ok((handle, path)) = self.resolve(database) else {
            return Vec::new();
        };
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(database, path = %path.display(), error = %e, "cannot stat database");
                return Vec::new();
            }
        };

        let token = self.authorizer.mint(handle.name(), csrf);
        vec![DatabaseAction {
            href: format!("{}?s={}", export_path(handle.name()), token),
            label: EXPORT_LABEL.to_string(),
            description: format!(
                "Create and download a snapshot of this SQLite database ({})",
                format_size(size)
            ),
        }]
    }
}

impl std::fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("export_dir", &self.artifacts.path())
            .field("available_permits", &self.limiter.available_permits())
            .finish_non_exhaustive()
    }
}

/// A finished snapshot waiting to be streamed.
///
/// Holds the artifact file and one concurrency permit. Both are released
/// when this value, or the stream built from it, is dropped.
#[derive(Debug)]
pub struct PreparedExport {
    artifact: Artifact,
    _permit: OwnedSemaphorePermit,
    download_name: String,
    size: u64,
    claims: ExportClaims,
}

impl PreparedExport {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Suggested filename for the download.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Snapshot size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn claims(&self) -> &ExportClaims {
        &self.claims
    }

    /// Open the snapshot for streaming in `chunk_size` pieces.
    pub async fn into_stream(self, chunk_size: usize) -> Result<ArtifactStream> {
        let file = tokio::fs::File::open(self.artifact.path()).await?;
        Ok(ArtifactStream::new(file, chunk_size, self))
    }
}
