//! SQLite access layer: raw query execution and schema bootstrap.
//!
//! # Responsibility
//! - Open and configure the single shared connection used by one session.
//! - Execute parameterized SQL text and hand back plain row mappings.
//! - Load schema scripts statement by statement.
//!
//! # Invariants
//! - Writes never auto-commit; callers own `commit()`/`rollback()`.
//! - Every statement failure is logged with its SQL text before it
//!   propagates.

use rusqlite::types::Value;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

mod executor;
mod open;
mod script;

pub use executor::QueryExecutor;
pub use open::{open_db, open_db_in_memory};
pub use script::split_sql_statements;

/// One result row: column name to engine value.
pub type RowMap = BTreeMap<String, Value>;

/// Named bind parameters. Keys are placeholder names without the `:` prefix.
pub type NamedParams = BTreeMap<String, Value>;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection bootstrap or transaction control failed.
    Sqlite(rusqlite::Error),
    /// A statement failed while executing against the engine.
    QueryExecution {
        statement: String,
        source: rusqlite::Error,
    },
    /// `read` was handed a statement that would modify the database.
    NotReadOnly { statement: String },
    /// A `:name` placeholder has no value in the parameter mapping.
    MissingBindParameter {
        statement: String,
        parameter: String,
    },
    SchemaFileNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    SchemaRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// One statement of a schema script failed.
    SchemaStatement {
        statement: String,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::QueryExecution { statement, source } => {
                write!(f, "query execution failed: {source}; statement: {statement}")
            }
            Self::NotReadOnly { statement } => {
                write!(f, "read refuses a mutating statement; statement: {statement}")
            }
            Self::MissingBindParameter {
                statement,
                parameter,
            } => write!(
                f,
                "missing value for bind parameter `{parameter}`; statement: {statement}"
            ),
            Self::SchemaFileNotFound { path, .. } => {
                write!(f, "schema script not found at `{}`", path.display())
            }
            Self::SchemaRead { path, source } => {
                write!(f, "failed to read schema script `{}`: {source}", path.display())
            }
            Self::SchemaStatement { statement, source } => {
                write!(f, "schema statement failed: {source}; statement: {statement}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::QueryExecution { source, .. } => Some(source),
            Self::NotReadOnly { .. } | Self::MissingBindParameter { .. } => None,
            Self::SchemaFileNotFound { source, .. } => Some(source),
            Self::SchemaRead { source, .. } => Some(source),
            Self::SchemaStatement { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// How a schema script is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaLoadMode {
    /// Each statement commits on its own; a failure leaves earlier
    /// statements applied.
    #[default]
    PerStatement,
    /// All statements run in one transaction that rolls back on failure.
    Atomic,
}

impl FromStr for SchemaLoadMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_statement" | "per-statement" => Ok(Self::PerStatement),
            "atomic" => Ok(Self::Atomic),
            other => Err(format!(
                "unsupported schema load mode `{other}`; expected per_statement|atomic"
            )),
        }
    }
}
