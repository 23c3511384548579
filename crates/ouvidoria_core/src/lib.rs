//! Persistence core for the municipal ombudsman backend.
//! Everything that reaches the database goes through this crate.

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, ConfigResult, DbConfig, LoggingConfig};
pub use db::{
    open_db, open_db_in_memory, DbError, DbResult, NamedParams, QueryExecutor, RowMap,
    SchemaLoadMode,
};
pub use filter::{CompareOp, Filter, FilterError, Logic, Predicate, SortDirection};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status, LogTarget};
pub use model::{Entity, EntityKind, KeyStrategy, ModelError};
pub use repo::{
    AnyRecord, ObjectFactory, QueryCollector, Record, RecordState, Registry, RepoError,
    RepoResult,
};
pub use service::RecordService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
