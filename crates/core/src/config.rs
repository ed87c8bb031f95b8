//! Service configuration via `dbexport.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working single-host setup that exports into the platform temp directory.
//! Components never read ambient state: the export directory, limits and
//! intervals resolved here are passed to them explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::DatabaseHandle;
use crate::error::{ExportError, Result};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "dbexport.toml";

/// One hour, the default reaper period and retention window.
pub const ONE_HOUR_SECS: u64 = 60 * 60;

/// A database entry from the `[[databases]]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseEntry {
    /// Name used in URLs
    pub name: String,
    /// On-disk location; absent for in-memory stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl From<&DatabaseEntry> for DatabaseHandle {
    fn from(entry: &DatabaseEntry) -> Self {
        DatabaseHandle::new(entry.name.clone(), entry.path.clone())
    }
}

/// Temp file reaper schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaperConfig {
    /// Seconds between sweeps (default: 3600)
    #[serde(default = "default_hour")]
    pub interval_secs: u64,
    /// Artifacts whose mtime is older than this are deleted (default: 3600)
    #[serde(default = "default_hour")]
    pub retention_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: ONE_HOUR_SECS,
            retention_secs: ONE_HOUR_SECS,
        }
    }
}

impl ReaperConfig {
    /// Period between sweeps.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Retention window for orphaned artifacts.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Base level directive, e.g. `"info"` or `"dbexport_server=debug"`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `"compact"` (default) or `"json"`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_hour() -> u64 {
    ONE_HOUR_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8001".to_string()
}

fn default_export_actors() -> Vec<String> {
    vec!["root".to_string()]
}

fn default_max_concurrent_exports() -> usize {
    4
}

fn default_snapshot_timeout_secs() -> u64 {
    600
}

fn default_chunk_size() -> usize {
    4096
}

/// Service configuration loaded from `dbexport.toml`.
///
/// # Example
///
/// ```toml
/// bind = "127.0.0.1:8001"
/// export_actors = ["root"]
///
/// [[databases]]
/// name = "fixtures"
/// path = "/data/fixtures.db"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Scratch directory for snapshot artifacts. Platform temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    /// Signing secret. A random per-process secret is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Actor ids allowed to see export links.
    #[serde(default = "default_export_actors")]
    pub export_actors: Vec<String>,
    /// Maximum token age in seconds; 0 disables expiry.
    #[serde(default = "default_hour")]
    pub token_max_age_secs: u64,
    /// Exports allowed to run at once.
    #[serde(default = "default_max_concurrent_exports")]
    pub max_concurrent_exports: usize,
    /// Seconds the snapshot process may run; 0 disables the timeout.
    #[serde(default = "default_snapshot_timeout_secs")]
    pub snapshot_timeout_secs: u64,
    /// Bytes per streamed response chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Reaper schedule.
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
    /// Registered databases.
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            export_dir: None,
            secret: None,
            export_actors: default_export_actors(),
            token_max_age_secs: ONE_HOUR_SECS,
            max_concurrent_exports: default_max_concurrent_exports(),
            snapshot_timeout_secs: default_snapshot_timeout_secs(),
            chunk_size: default_chunk_size(),
            reaper: ReaperConfig::default(),
            log: LogConfig::default(),
            databases: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// The export directory, falling back to the platform temp directory.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Token lifetime, or `None` when expiry is disabled.
    pub fn token_max_age(&self) -> Option<Duration> {
        (self.token_max_age_secs > 0).then(|| Duration::from_secs(self.token_max_age_secs))
    }

    /// Snapshot timeout, or `None` when disabled.
    pub fn snapshot_timeout(&self) -> Option<Duration> {
        (self.snapshot_timeout_secs > 0).then(|| Duration::from_secs(self.snapshot_timeout_secs))
    }

    /// Database handles for every configured entry.
    pub fn database_handles(&self) -> Vec<DatabaseHandle> {
        self.databases.iter().map(DatabaseHandle::from).collect()
    }

    /// Check the limits and database names.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is zero or a database name is empty,
    /// reserved, or duplicated.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ExportError::config("chunk_size must be greater than 0"));
        }
        if self.max_concurrent_exports == 0 {
            return Err(ExportError::config(
                "max_concurrent_exports must be greater than 0",
            ));
        }
        if self.reaper.interval_secs == 0 {
            return Err(ExportError::config(
                "reaper.interval_secs must be greater than 0",
            ));
        }
        let mut seen = BTreeSet::new();
        for entry in &self.databases {
            if entry.name.is_empty() || entry.name.contains('/') || entry.name == "-" {
                return Err(ExportError::config(format!(
                    "Invalid database name '{}'",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ExportError::config(format!(
                    "Database '{}' is configured more than once",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# dbexport configuration

# Address the HTTP server listens on.
bind = "127.0.0.1:8001"

# Scratch directory for snapshot artifacts (default: platform temp dir).
# export_dir = "/var/tmp/dbexport"

# Signing secret for export links. When unset a random secret is generated
# at startup, so links stop working after a restart.
# secret = "change-me"

# Actor ids that are shown export links.
export_actors = ["root"]

# Export links older than this are rejected (0 = never expire).
token_max_age_secs = 3600

# Exports allowed to run at the same time.
max_concurrent_exports = 4

# Seconds a snapshot may take before it is killed (0 = no limit).
snapshot_timeout_secs = 600

# Bytes per streamed response chunk.
chunk_size = 4096

[reaper]
interval_secs = 3600
retention_secs = 3600

[log]
level = "info"
format = "compact"   # or "json"

# [[databases]]
# name = "fixtures"
# path = "/data/fixtures.db"
#
# [[databases]]
# name = "_memory"      # no path: not exportable
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExportError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| {
            ExportError::config(format!("Invalid config file '{}': {}", path.display(), e))
        })
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ExportConfig =
            toml::from_str(content).map_err(|e| ExportError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `true` if the file was created.
    pub fn write_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, Self::default_toml()).map_err(|e| {
            ExportError::config(format!(
                "Failed to write default config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(true)
    }
}
