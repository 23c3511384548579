//! Schema script loading and statement splitting.

use super::{DbError, DbResult};
use log::error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Splits a SQL script into executable statements.
///
/// Lines are joined until one ends with `;`. Blank lines and `--` comment
/// lines are skipped. The trailing `;` is stripped, and a final statement
/// without a terminator is still returned.
pub fn split_sql_statements(raw_sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in raw_sql.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with("--") {
            continue;
        }

        buffer.push(line);
        if stripped.ends_with(';') {
            push_statement(&mut statements, &buffer);
            buffer.clear();
        }
    }

    if !buffer.is_empty() {
        push_statement(&mut statements, &buffer);
    }

    statements
}

fn push_statement(statements: &mut Vec<String>, lines: &[&str]) {
    let joined = lines.join("\n");
    let statement = joined.trim().trim_end_matches(';').trim_end();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

/// Makes `path` absolute without requiring it to exist.
pub(crate) fn resolve_script_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub(crate) fn load_statements(path: &Path) -> DbResult<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(split_sql_statements(&raw)),
        Err(source) if source.kind() == ErrorKind::NotFound => {
            error!(
                "event=schema_load module=db status=error error_code=schema_not_found path={}",
                path.display()
            );
            Err(DbError::SchemaFileNotFound {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => {
            error!(
                "event=schema_load module=db status=error error_code=schema_read_failed path={} error={}",
                path.display(),
                source
            );
            Err(DbError::SchemaRead {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
