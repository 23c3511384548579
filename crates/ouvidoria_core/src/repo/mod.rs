//! Generic persistence layer over the entity descriptors.
//!
//! # Responsibility
//! - Active records: insert, update and delete any entity from its
//!   declared key and field lists.
//! - Registry/factory turning an entity-type name and a row into a typed
//!   record.
//! - Collector running a [`Filter`](crate::filter::Filter) and
//!   materializing the matching records.
//!
//! # Invariants
//! - No entity-specific SQL lives here; everything derives from
//!   [`Entity`](crate::model::Entity) declarations.
//! - Records never commit; the session that owns the executor does.

use crate::db::DbError;
use crate::filter::FilterError;
use crate::model::{EntityKind, ModelError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod collector;
pub mod record;
pub mod registry;

pub use collector::{build_select, QueryCollector};
pub use record::{AnyRecord, Persistable, Record, RecordState};
pub use registry::{Constructor, ObjectFactory, Registry};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by records, the factory and the collector.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Model(ModelError),
    Filter(FilterError),
    /// The factory has no constructor for this name.
    UnknownEntityType(String),
    /// Registry names must be plain identifiers.
    InvalidEntityName(String),
    DuplicateEntityName(String),
    /// The operation is not allowed in the record's current lifecycle state.
    InvalidState {
        kind: EntityKind,
        state: RecordState,
        operation: &'static str,
    },
    /// An update or delete matched no row.
    NotFound { kind: EntityKind, key: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::Filter(err) => write!(f, "{err}"),
            Self::UnknownEntityType(name) => write!(f, "unknown object type: {name}"),
            Self::InvalidEntityName(name) => write!(f, "invalid entity type name: {name}"),
            Self::DuplicateEntityName(name) => {
                write!(f, "entity type already registered: {name}")
            }
            Self::InvalidState {
                kind,
                state,
                operation,
            } => write!(f, "cannot {operation} {kind} record in {state} state"),
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::Filter(err) => Some(err),
            Self::UnknownEntityType(_)
            | Self::InvalidEntityName(_)
            | Self::DuplicateEntityName(_)
            | Self::InvalidState { .. }
            | Self::NotFound { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ModelError> for RepoError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

impl From<FilterError> for RepoError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}
