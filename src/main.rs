//! dbexport command-line entry point.
//!
//! - `dbexport serve`: run the HTTP export server
//! - `dbexport snapshot SOURCE DEST`: one `VACUUM INTO`, used by the server
//!   as its snapshot subprocess
//! - `dbexport init-config [PATH]`: write a default config file

mod commands;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context as _};
use clap::ArgMatches;
use dbexport_core::{DatabaseEntry, ExportConfig, CONFIG_FILE_NAME};
use dbexport_durability::{vacuum_into, SNAPSHOT_SUBCOMMAND};

use commands::build_cli;

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some((SNAPSHOT_SUBCOMMAND, sub)) => run_snapshot(sub),
        Some(("init-config", sub)) => run_init_config(sub),
        Some(("serve", sub)) => run_serve(sub),
        _ => run_serve(&ArgMatches::default()),
    }
}

fn run_snapshot(matches: &ArgMatches) {
    let source = required_path(matches, "source");
    let dest = required_path(matches, "dest");
    if let Err(e) = vacuum_into(&source, &dest) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run_init_config(matches: &ArgMatches) {
    let path = required_path(matches, "path");
    match ExportConfig::write_default_if_missing(&path) {
        Ok(true) => eprintln!("Wrote {}", path.display()),
        Ok(false) => eprintln!("{} already exists, left unchanged", path.display()),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn run_serve(matches: &ArgMatches) {
    let config = match load_config(matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    if let Err(e) = dbexport_server::init_logging(&config.log.level, &config.log.format) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    let result = actix_web::rt::System::new().block_on(dbexport_server::run(config));
    if let Err(e) = result {
        tracing::error!(error = %format!("{:#}", e), "server failed");
        process::exit(1);
    }
}

fn required_path(matches: &ArgMatches, id: &str) -> PathBuf {
    matches
        .get_one::<String>(id)
        .map(PathBuf::from)
        .unwrap_or_default()
}

/// Config file, then command-line overrides.
fn load_config(matches: &ArgMatches) -> anyhow::Result<ExportConfig> {
    let explicit = matches
        .try_get_one::<String>("config")
        .ok()
        .flatten()
        .map(PathBuf::from);
    let mut config = match explicit {
        Some(path) => ExportConfig::from_file(&path)?,
        None if Path::new(CONFIG_FILE_NAME).exists() => {
            ExportConfig::from_file(Path::new(CONFIG_FILE_NAME))?
        }
        None => ExportConfig::default(),
    };

    if let Ok(Some(bind)) = matches.try_get_one::<String>("bind") {
        config.bind = bind.clone();
    }
    if let Ok(Some(dir)) = matches.try_get_one::<String>("export-dir") {
        config.export_dir = Some(PathBuf::from(dir));
    }
    if let Ok(Some(entries)) = matches.try_get_many::<String>("database") {
        for entry in entries {
            config.databases.push(parse_database_arg(entry)?);
        }
    }

    config.validate()?;
    Ok(config)
}

/// Parse `NAME=PATH`.
fn parse_database_arg(arg: &str) -> anyhow::Result<DatabaseEntry> {
    let Some((name, path)) = arg.split_once('=') else {
        bail!("Expected NAME=PATH, got '{}'", arg);
    };
    if path.is_empty() {
        bail!("Missing path for database '{}'", name);
    }
    let path = PathBuf::from(path);
    let path = path
        .canonicalize()
        .with_context(|| format!("Database file '{}' not found", path.display()))?;
    Ok(DatabaseEntry {
        name: name.to_string(),
        path: Some(path),
    })
}
