//! Core types for dbexport
//!
//! This crate defines the foundational types shared by every layer:
//! - ExportError / AuthError: the request-level error taxonomy
//! - ExportConfig: `dbexport.toml` settings, injected into each component
//! - DatabaseHandle / DatabaseRegistry: named stores and their on-disk paths
//! - naming: artifact names, download names, and size formatting

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod error;
pub mod naming;

pub use config::{DatabaseEntry, ExportConfig, LogConfig, ReaperConfig, CONFIG_FILE_NAME};
pub use database::{DatabaseHandle, DatabaseRegistry, StaticRegistry};
pub use error::{AuthError, ExportError, Result};
pub use naming::{
    artifact_file_name, download_file_name, format_size, is_artifact_name, ARTIFACT_EXTENSION,
    ARTIFACT_PREFIX,
};
