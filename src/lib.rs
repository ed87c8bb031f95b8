//! dbexport: signed, session-bound downloads of consistent SQLite snapshots.
//!
//! The workspace is split by concern:
//!
//! - [`core`]: config, database registry, errors, file naming
//! - [`security`]: HMAC signer, export tokens, permission policy
//! - [`durability`]: capacity check, `VACUUM INTO` snapshots, artifacts, reaper
//! - [`server`]: actix-web routes and the export orchestrator
//!
//! # Quick Start
//!
//! ```ignore
//! use dbexport::core::ExportConfig;
//!
//! let config = ExportConfig::from_toml(r#"
//! [[databases]]
//! name = "data"
//! path = "/srv/data.db"
//! "#)?;
//! dbexport::server::run(config).await?;
//! ```

pub use dbexport_core as core;
pub use dbexport_durability as durability;
pub use dbexport_security as security;
pub use dbexport_server as server;
