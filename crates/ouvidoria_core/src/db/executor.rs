//! Raw SQL executor bound to one shared SQLite connection.
//!
//! # Responsibility
//! - Run parameterized reads and writes with `:name` placeholders.
//! - Own explicit transaction control for one unit of work.
//! - Apply schema scripts.
//!
//! # Invariants
//! - The first `write` opens a transaction; nothing is durable until
//!   `commit()`.
//! - Reads run on the same connection and therefore see pending writes.
//! - The executor is not `Sync`; one session owns it at a time.

use super::script::{load_statements, resolve_script_path};
use super::{DbError, DbResult, NamedParams, RowMap, SchemaLoadMode};
use crate::config::DbConfig;
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{Connection, Statement};
use std::path::{Path, PathBuf};

/// Executes raw SQL against the shared connection of one session.
pub struct QueryExecutor {
    conn: Connection,
    schema_script: PathBuf,
    schema_load_mode: SchemaLoadMode,
}

impl QueryExecutor {
    pub(crate) fn new(conn: Connection, config: &DbConfig) -> Self {
        Self {
            conn,
            schema_script: config.schema_script.clone(),
            schema_load_mode: config.schema_load_mode,
        }
    }

    /// Underlying connection, for callers that need engine-specific access.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_load_mode(&self) -> SchemaLoadMode {
        self.schema_load_mode
    }

    /// Runs a row-returning statement and collects every row.
    ///
    /// Always returns a list, possibly empty. Statements that would modify
    /// the database are rejected with [`DbError::NotReadOnly`] before they
    /// run.
    pub fn read(&self, sql: &str, params: &NamedParams) -> DbResult<Vec<RowMap>> {
        self.read_rows(sql, params)
            .inspect_err(|err| log_statement_failure("db_read", sql, err))
    }

    /// Runs a mutating statement inside the pending transaction.
    ///
    /// Opens the transaction when none is pending. Returns the number of
    /// affected rows.
    pub fn write(&self, sql: &str, params: &NamedParams) -> DbResult<usize> {
        self.write_rows(sql, params)
            .inspect_err(|err| log_statement_failure("db_write", sql, err))
    }

    /// Makes all pending writes durable. No-op when nothing is pending.
    pub fn commit(&self) -> DbResult<()> {
        if !self.has_pending_writes() {
            return Ok(());
        }
        self.conn.execute_batch("COMMIT;").map_err(|err| {
            error!("event=db_commit module=db status=error error={err}");
            DbError::Sqlite(err)
        })?;
        debug!("event=db_commit module=db status=ok");
        Ok(())
    }

    /// Discards all pending writes. No-op when nothing is pending.
    pub fn rollback(&self) -> DbResult<()> {
        if !self.has_pending_writes() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK;").map_err(|err| {
            error!("event=db_rollback module=db status=error error={err}");
            DbError::Sqlite(err)
        })?;
        debug!("event=db_rollback module=db status=ok");
        Ok(())
    }

    /// Whether a transaction opened by `write` is still waiting for
    /// `commit()` or `rollback()`.
    pub fn has_pending_writes(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Engine-assigned rowid of the most recent successful insert.
    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Reads a schema script and executes its statements in order.
    ///
    /// `None` resolves to the configured default script. Returns the number
    /// of statements applied; an empty script logs a warning and returns 0.
    ///
    /// In [`SchemaLoadMode::PerStatement`] every statement is committed as
    /// it succeeds (writes already pending are committed with the first
    /// one), so a failure leaves earlier statements applied and only the
    /// failing statement's transaction is rolled back. In
    /// [`SchemaLoadMode::Atomic`] the whole script shares one transaction
    /// that is rolled back on the first failure.
    pub fn create_schema_from_script(&self, script_path: Option<&Path>) -> DbResult<usize> {
        let resolved = resolve_script_path(script_path.unwrap_or(self.schema_script.as_path()));
        let statements = load_statements(&resolved)?;

        if statements.is_empty() {
            warn!(
                "event=schema_load module=db status=warn reason=empty_script path={}",
                resolved.display()
            );
            return Ok(0);
        }

        info!(
            "event=schema_load module=db status=start path={} statements={} mode={:?}",
            resolved.display(),
            statements.len(),
            self.schema_load_mode
        );

        for statement in &statements {
            if let Err(err) = self.execute_schema_statement(statement) {
                self.rollback()?;
                return Err(err);
            }
            if self.schema_load_mode == SchemaLoadMode::PerStatement {
                self.commit()?;
            }
        }
        self.commit()?;

        info!(
            "event=schema_load module=db status=ok path={} statements={}",
            resolved.display(),
            statements.len()
        );
        Ok(statements.len())
    }

    fn execute_schema_statement(&self, statement: &str) -> DbResult<()> {
        self.begin_if_needed()?;
        self.conn.execute_batch(statement).map_err(|source| {
            error!(
                "event=schema_statement module=db status=error error={} statement={}",
                source,
                single_line(statement)
            );
            DbError::SchemaStatement {
                statement: statement.to_string(),
                source,
            }
        })
    }

    fn begin_if_needed(&self) -> DbResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN;")?;
        }
        Ok(())
    }

    fn read_rows(&self, sql: &str, params: &NamedParams) -> DbResult<Vec<RowMap>> {
        let mut stmt = self.conn.prepare(sql).map_err(|err| query_error(sql, err))?;
        if !stmt.readonly() {
            return Err(DbError::NotReadOnly {
                statement: sql.to_string(),
            });
        }
        bind_named(&mut stmt, sql, params)?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|err| query_error(sql, err))? {
            let mut mapped = RowMap::new();
            for (index, column) in columns.iter().enumerate() {
                let value: Value = row.get(index).map_err(|err| query_error(sql, err))?;
                mapped.insert(column.clone(), value);
            }
            out.push(mapped);
        }

        Ok(out)
    }

    fn write_rows(&self, sql: &str, params: &NamedParams) -> DbResult<usize> {
        let mut stmt = self.conn.prepare(sql).map_err(|err| query_error(sql, err))?;
        bind_named(&mut stmt, sql, params)?;
        self.begin_if_needed()?;
        stmt.raw_execute().map_err(|err| query_error(sql, err))
    }
}

impl Drop for QueryExecutor {
    fn drop(&mut self) {
        if self.has_pending_writes() {
            warn!("event=db_close module=db status=warn reason=uncommitted_writes_discarded");
        }
    }
}

/// Binds every placeholder of `stmt` from `params`.
///
/// Keys without a matching placeholder are ignored. Positional `?`
/// placeholders have no name and are reported as missing.
fn bind_named(stmt: &mut Statement<'_>, sql: &str, params: &NamedParams) -> DbResult<()> {
    for index in 1..=stmt.parameter_count() {
        let name = stmt
            .parameter_name(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("?{index}"));
        let key = name.trim_start_matches([':', '@', '$']);

        let Some(value) = params.get(key) else {
            return Err(DbError::MissingBindParameter {
                statement: sql.to_string(),
                parameter: name,
            });
        };

        stmt.raw_bind_parameter(index, value)
            .map_err(|err| query_error(sql, err))?;
    }
    Ok(())
}

fn query_error(sql: &str, source: rusqlite::Error) -> DbError {
    DbError::QueryExecution {
        statement: sql.to_string(),
        source,
    }
}

fn log_statement_failure(event: &str, sql: &str, err: &DbError) {
    error!(
        "event={} module=db status=error error={} statement={}",
        event,
        err,
        single_line(sql)
    );
}

fn single_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
