//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and bootstrap the ombudsman database.
#[derive(Parser, Debug)]
#[command(name = "ouvidoria")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; `OUVIDORIA_*` variables are used when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding the configured path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a schema script to the database
    InitSchema {
        /// Script path; defaults to the configured script
        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// Print every record of an entity type, ordered by key
    List {
        /// Registry name, e.g. `localidade`
        entity: String,
    },

    /// Print records whose field equals a value
    Find {
        entity: String,
        field: String,
        /// Integers are compared as integers, anything else as text
        value: String,
    },
}
