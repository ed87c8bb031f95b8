//! Names for snapshot artifacts and downloads, and human-readable sizes

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reserved prefix for every artifact written to the export directory.
///
/// The reaper only ever touches files that start with this prefix.
pub const ARTIFACT_PREFIX: &str = "export-database-";

/// Extension of artifacts and suggested download names.
pub const ARTIFACT_EXTENSION: &str = "db";

/// Replace anything outside `[A-Za-z0-9_-]` so a database name can never
/// introduce a path separator or a leading dot into a file name.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// A fresh artifact file name: prefix, sanitised database name, random suffix.
pub fn artifact_file_name(database: &str) -> String {
    format!(
        "{}{}-{}.{}",
        ARTIFACT_PREFIX,
        sanitize_component(database),
        Uuid::new_v4().simple(),
        ARTIFACT_EXTENSION
    )
}

/// Whether a directory entry name belongs to the artifact namespace.
pub fn is_artifact_name(file_name: &str) -> bool {
    file_name.starts_with(ARTIFACT_PREFIX)
}

/// Suggested download name: `<database>-<YYYY-MM-DD-HH-MM>.db` in UTC.
pub fn download_file_name(database: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.{}",
        database,
        at.format("%Y-%m-%d-%H-%M"),
        ARTIFACT_EXTENSION
    )
}

/// Format a byte count with decimal units ("1 Byte", "12 Bytes", "4.1 MB").
pub fn format_size(bytes: u64) -> String {
    const BASE: f64 = 1000.0;
    const PREFIXES: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

    if bytes == 1 {
        return "1 Byte".to_string();
    }
    if (bytes as f64) < BASE {
        return format!("{} Bytes", bytes);
    }

    let value = bytes as f64;
    let mut unit = BASE;
    for prefix in PREFIXES {
        unit *= BASE;
        if value < unit || prefix == "YB" {
            return format!("{:.1} {}", BASE * value / unit, prefix);
        }
    }
    unreachable!("the YB prefix always returns")
}
