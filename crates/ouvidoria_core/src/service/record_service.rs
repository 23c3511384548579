//! Generic CRUD service for every registered entity.
//!
//! # Responsibility
//! - Create, fetch, list, save and remove records by entity-type name.
//! - Commit each mutating call on success and roll back on failure.
//!
//! # Invariants
//! - Read calls never commit or roll back.
//! - `list` is ordered by the primary key, ascending.
//! - Records passed to `save`/`remove` must come from this service's
//!   executor; the commit only covers that connection.

use crate::db::{QueryExecutor, RowMap};
use crate::filter::{Filter, Predicate, SortDirection};
use crate::model::EntityKind;
use crate::repo::{AnyRecord, ObjectFactory, QueryCollector, RepoError, RepoResult};
use log::{error, info, warn};
use rusqlite::types::Value;
use std::time::Instant;

/// Unit-of-work facade over one executor.
pub struct RecordService<'db> {
    db: &'db QueryExecutor,
    collector: QueryCollector<'db>,
}

impl<'db> RecordService<'db> {
    /// Service backed by the default entity registry.
    pub fn new(db: &'db QueryExecutor) -> Self {
        Self::with_factory(db, ObjectFactory::default())
    }

    pub fn with_factory(db: &'db QueryExecutor, factory: ObjectFactory) -> Self {
        Self {
            db,
            collector: QueryCollector::with_factory(db, factory),
        }
    }

    /// Builds a Transient record from `data`, inserts it and commits.
    ///
    /// The returned record is Persisted and carries the assigned key.
    pub fn create(&self, type_name: &str, data: &RowMap) -> RepoResult<AnyRecord<'db>> {
        self.unit_of_work("create", type_name, || {
            let mut record = self
                .collector
                .factory()
                .create_instance(type_name, data, self.db, false)?;
            record.update()?;
            Ok(record)
        })
    }

    /// Fetches one record by its single-column primary key.
    pub fn get_by_id(
        &self,
        type_name: &str,
        key: impl Into<Value>,
    ) -> RepoResult<Option<AnyRecord<'db>>> {
        let kind = parse_kind(type_name)?;
        let [key_field] = kind.key_fields() else {
            return Err(RepoError::InvalidData(format!(
                "{kind} has a composite key; use find instead"
            )));
        };

        let filter = Filter::new(kind.name(), vec![Predicate::equal_to(*key_field, key)])?;
        Ok(self.collector.collect(&filter)?.into_iter().next())
    }

    /// Every record of the entity type, ordered by primary key ascending.
    pub fn list(&self, type_name: &str) -> RepoResult<Vec<AnyRecord<'db>>> {
        let kind = parse_kind(type_name)?;
        let ordering = kind
            .key_fields()
            .iter()
            .map(|field| Predicate::order_by(*field, SortDirection::Asc))
            .take(1)
            .collect();
        let filter = Filter::new(kind.name(), ordering)?;
        self.collector.collect(&filter)
    }

    /// Runs an arbitrary filter.
    pub fn find(&self, filter: &Filter) -> RepoResult<Vec<AnyRecord<'db>>> {
        self.collector.collect(filter)
    }

    /// Inserts or updates the record and commits.
    ///
    /// On failure the record is restored to its state before the call.
    pub fn save(&self, record: &mut AnyRecord<'db>) -> RepoResult<()> {
        self.mutate("save", record, AnyRecord::update)
    }

    /// Deletes the record's row and commits.
    ///
    /// On failure the record is restored to its state before the call.
    pub fn remove(&self, record: &mut AnyRecord<'db>) -> RepoResult<()> {
        self.mutate("remove", record, AnyRecord::delete)
    }

    /// Runs `change` as one unit of work; on failure the record is reset to
    /// its snapshot, matching the rolled-back row.
    fn mutate(
        &self,
        operation: &'static str,
        record: &mut AnyRecord<'db>,
        change: fn(&mut AnyRecord<'db>) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let kind = record.kind();
        let snapshot = record.clone();
        let result = self.unit_of_work(operation, kind.name(), || change(record));
        if result.is_err() {
            *record = snapshot;
        }
        result
    }

    fn unit_of_work<T>(
        &self,
        operation: &'static str,
        type_name: &str,
        body: impl FnOnce() -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = body().and_then(|value| {
            self.db.commit()?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                info!(
                    "event=record_{} module=service status=ok entity={} duration_ms={}",
                    operation,
                    type_name.trim(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.db.rollback() {
                    error!(
                        "event=record_{} module=service status=error error_code=rollback_failed error={}",
                        operation, rollback_err
                    );
                }
                warn!(
                    "event=record_{} module=service status=error entity={} error={}",
                    operation,
                    type_name.trim(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn parse_kind(type_name: &str) -> RepoResult<EntityKind> {
    type_name
        .parse::<EntityKind>()
        .map_err(|_| RepoError::UnknownEntityType(type_name.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_kind;
    use crate::model::EntityKind;
    use crate::repo::RepoError;

    #[test]
    fn parse_kind_maps_unknown_names_to_repo_error() {
        assert_eq!(parse_kind(" Telefone ").unwrap(), EntityKind::Telefone);
        assert!(matches!(
            parse_kind("unknown"),
            Err(RepoError::UnknownEntityType(name)) if name == "unknown"
        ));
    }
}
