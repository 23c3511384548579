//! Connection bootstrap for the query executor.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas from [`DbConfig`].
//!
//! # Invariants
//! - Returned executors start with no pending transaction.
//! - Schema is not applied here; callers run
//!   `create_schema_from_script` explicitly.

use super::{DbResult, QueryExecutor};
use crate::config::DbConfig;
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens the database described by `config`.
///
/// A missing `database_path` opens a private in-memory database.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(config: &DbConfig) -> DbResult<QueryExecutor> {
    let started_at = Instant::now();
    let mode = if config.database_path.is_some() {
        "file"
    } else {
        "memory"
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.database_path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    };

    let conn = match opened.and_then(|conn| configure_connection(&conn, config).map(|()| conn)) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    info!(
        "event=db_open module=db status=ok mode={} duration_ms={}",
        mode,
        started_at.elapsed().as_millis()
    );
    Ok(QueryExecutor::new(conn, config))
}

/// Opens an in-memory database with default settings.
pub fn open_db_in_memory() -> DbResult<QueryExecutor> {
    open_db(&DbConfig::default())
}

fn configure_connection(conn: &Connection, config: &DbConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
