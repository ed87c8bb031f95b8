//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};
use dbexport_core::CONFIG_FILE_NAME;
use dbexport_durability::SNAPSHOT_SUBCOMMAND;

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("dbexport")
        .about("Download consistent snapshots of SQLite databases over HTTP")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(false)
        .subcommand(build_serve())
        .subcommand(build_snapshot())
        .subcommand(build_init_config())
}

fn build_serve() -> Command {
    Command::new("serve")
        .about("Run the export server (default when no subcommand is given)")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Config file (default: ./dbexport.toml if present)"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .help("Listen address, overrides the config file"),
        )
        .arg(
            Arg::new("export-dir")
                .long("export-dir")
                .help("Directory for snapshot files, overrides the config file"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .short('d')
                .value_name("NAME=PATH")
                .help("Serve a database file; repeatable")
                .action(ArgAction::Append),
        )
}

fn build_snapshot() -> Command {
    Command::new(SNAPSHOT_SUBCOMMAND)
        .about("Copy SOURCE into the empty file DEST with VACUUM INTO")
        .arg(Arg::new("source").required(true).help("Source database"))
        .arg(Arg::new("dest").required(true).help("Destination file"))
}

fn build_init_config() -> Command {
    Command::new("init-config")
        .about("Write a commented default config file")
        .arg(
            Arg::new("path")
                .default_value(CONFIG_FILE_NAME)
                .help("Where to write it"),
        )
}
