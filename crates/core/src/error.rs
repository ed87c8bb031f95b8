//! Error types for dbexport
//!
//! Every failure an export request can reach is an [`ExportError`]. The
//! `Display` text of the user-facing variants is exactly the plain-text body
//! returned to the client, so the HTTP layer only has to choose a status code.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Reasons a signed export link is refused.
///
/// The messages deliberately say which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Token was not produced by this process's secret for this purpose
    #[error("Bad signature")]
    BadSignature,

    /// Token was signed for a different session's anti-forgery value
    #[error("Signature csrftoken did not match")]
    CsrfMismatch,

    /// Token is older than the configured maximum age
    #[error("Signature expired")]
    Expired,
}

/// Error types for an export request
#[derive(Debug, Error)]
pub enum ExportError {
    /// No database is registered under this name
    #[error("Database not found: {name}")]
    DatabaseNotFound {
        /// Requested database name
        name: String,
    },

    /// The database has no on-disk representation (in-memory or internal)
    #[error("Database cannot be exported, it does not exist on disk")]
    NotExportable,

    /// The export link failed verification
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The export directory has less free space than the source database
    #[error("Not enough space in {} to export this database", export_dir.display())]
    InsufficientSpace {
        /// Directory that was measured
        export_dir: PathBuf,
    },

    /// Every export slot is taken
    #[error("Too many exports in progress, try again later")]
    Busy,

    /// The snapshot step failed; carries the captured diagnostic text
    #[error("{message}")]
    Produce {
        /// Trimmed stderr of the snapshot process, or a description of the failure
        message: String,
    },

    /// I/O error (stat, artifact allocation, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExportError {
    /// Create a produce error from captured diagnostic text.
    pub fn produce(message: impl Into<String>) -> Self {
        ExportError::Produce {
            message: message.into().trim().to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ExportError::Config(message.into())
    }

    /// Whether the failure was caused by the request rather than the host.
    ///
    /// Client errors are terminal and are never retried automatically.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::DatabaseNotFound { .. }
                | ExportError::NotExportable
                | ExportError::Auth(_)
                | ExportError::InsufficientSpace { .. }
                | ExportError::Busy
        )
    }
}
