//! Filter execution and row materialization.
//!
//! # Responsibility
//! - Turn a [`Filter`] into one `SELECT` with named bind parameters.
//! - Convert every returned row into a Persisted record via the factory.
//!
//! # Invariants
//! - Result cardinality and order equal the engine's result set.
//! - Entity-type existence is checked by the factory, per row.

use super::record::{AnyRecord, Persistable, Record};
use super::registry::ObjectFactory;
use super::{RepoError, RepoResult};
use crate::db::{NamedParams, QueryExecutor};
use crate::filter::Filter;
use log::debug;

/// Renders `SELECT * FROM <TABLE> WHERE 1=1 <predicates>`.
pub fn build_select(filter: &Filter) -> (String, NamedParams) {
    let (tail, params) = filter.render();
    let mut sql = format!(
        "SELECT * FROM {} WHERE 1=1",
        filter.object_type().to_ascii_uppercase()
    );
    if !tail.is_empty() {
        sql.push(' ');
        sql.push_str(&tail);
    }
    (sql, params)
}

/// Runs filters against one executor.
pub struct QueryCollector<'db> {
    db: &'db QueryExecutor,
    factory: ObjectFactory,
}

impl<'db> QueryCollector<'db> {
    /// Collector backed by the default entity registry.
    pub fn new(db: &'db QueryExecutor) -> Self {
        Self::with_factory(db, ObjectFactory::default())
    }

    pub fn with_factory(db: &'db QueryExecutor, factory: ObjectFactory) -> Self {
        Self { db, factory }
    }

    pub fn factory(&self) -> &ObjectFactory {
        &self.factory
    }

    /// Returns every matching row as a Persisted record, in result order.
    ///
    /// # Errors
    /// - `Db` when the query fails.
    /// - `UnknownEntityType` when rows come back for an unregistered name.
    /// - `Model` when a row cannot populate the entity.
    pub fn collect(&self, filter: &Filter) -> RepoResult<Vec<AnyRecord<'db>>> {
        let (sql, params) = build_select(filter);
        let rows = self.db.read(&sql, &params)?;

        debug!(
            "event=collect module=repo status=ok object_type={} rows={}",
            filter.object_type(),
            rows.len()
        );

        rows.iter()
            .map(|row| {
                self.factory
                    .create_instance(filter.object_type(), row, self.db, true)
            })
            .collect()
    }

    /// Like [`collect`](Self::collect), downcasting every record to `E`.
    ///
    /// # Errors
    /// - `InvalidData` when the filter names another entity kind.
    pub fn collect_as<E: Persistable>(&self, filter: &Filter) -> RepoResult<Vec<Record<'db, E>>> {
        self.collect(filter)?
            .into_iter()
            .map(|record| {
                record.downcast::<E>().map_err(|other| {
                    RepoError::InvalidData(format!(
                        "filter on `{}` produced {} records, expected {}",
                        filter.object_type(),
                        other.kind(),
                        E::KIND
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::build_select;
    use crate::filter::{Filter, Predicate, SortDirection};
    use rusqlite::types::Value;

    #[test]
    fn empty_filter_selects_whole_table() {
        let (sql, params) = build_select(&Filter::all("localidade").unwrap());
        assert_eq!(sql, "SELECT * FROM LOCALIDADE WHERE 1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn predicates_are_appended_in_order() {
        let filter = Filter::new(
            "cargo",
            vec![
                Predicate::equal_to("nome", "Manager".to_string()),
                Predicate::like("descricao", "%things%".to_string()).or(),
                Predicate::order_by("cod_cargo", SortDirection::Desc),
            ],
        )
        .unwrap();

        let (sql, params) = build_select(&filter);
        assert_eq!(
            sql,
            "SELECT * FROM CARGO WHERE 1=1 AND nome = :nome OR descricao LIKE :descricao ORDER BY cod_cargo DESC"
        );
        assert_eq!(params.get("nome"), Some(&Value::Text("Manager".into())));
        assert_eq!(params.len(), 2);
    }
}
