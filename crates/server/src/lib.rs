//! HTTP surface for dbexport.
//!
//! Wires the signed-link check, the capacity guard, the snapshot producer,
//! and the artifact directory into two actix-web routes:
//!
//! - `GET /{database}/-/export-database?s=<token>` streams a fresh snapshot
//! - `GET /{database}` lists the export link for callers allowed to see it

pub mod app;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod orchestrator;
pub mod session;
pub mod stream;

pub use app::{configure, run, AppState, DEFAULT_CHUNK_SIZE};
pub use error::ApiError;
pub use logging::{init_logging, LogFormat};
pub use orchestrator::{
    export_path, DatabaseAction, ExportOrchestrator, PreparedExport,
    DEFAULT_MAX_CONCURRENT_EXPORTS, EXPORT_LABEL,
};
pub use session::{ACTOR_COOKIE, CSRF_COOKIE};
pub use stream::ArtifactStream;
