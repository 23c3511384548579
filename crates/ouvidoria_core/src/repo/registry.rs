//! Entity registry and object factory.
//!
//! # Responsibility
//! - Map entity-type names to record constructors.
//! - Build typed records from raw row mappings by name.
//!
//! # Invariants
//! - Registry names are lower-case identifiers, unique per registry.
//! - A registry is built once and only read afterwards; factories share it.

use super::record::{AnyRecord, Persistable, Record};
use super::{RepoError, RepoResult};
use crate::db::{QueryExecutor, RowMap};
use crate::filter::is_valid_identifier;
use crate::model::{
    Avaliacao, Cargo, Email, Funcionario, Localidade, Morador, Ocorrencia, OrgaoPublico, Servico,
    Telefone, TipoOcorrencia,
};
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds one record from `(executor, row, in_db)`.
pub type Constructor =
    for<'db> fn(&'db QueryExecutor, &RowMap, bool) -> RepoResult<AnyRecord<'db>>;

/// Name-to-constructor table.
#[derive(Clone, Default)]
pub struct Registry {
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every entity of the domain model.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert_entity::<Morador>();
        registry.insert_entity::<Funcionario>();
        registry.insert_entity::<Cargo>();
        registry.insert_entity::<Email>();
        registry.insert_entity::<Telefone>();
        registry.insert_entity::<Localidade>();
        registry.insert_entity::<OrgaoPublico>();
        registry.insert_entity::<TipoOcorrencia>();
        registry.insert_entity::<Ocorrencia>();
        registry.insert_entity::<Servico>();
        registry.insert_entity::<Avaliacao>();
        registry
    }

    /// Registers a constructor under `name` (trimmed, lower-cased).
    pub fn register(&mut self, name: &str, constructor: Constructor) -> RepoResult<()> {
        let normalized = normalize_name(name);
        if !is_valid_identifier(&normalized) {
            return Err(RepoError::InvalidEntityName(name.trim().to_string()));
        }
        if self.constructors.contains_key(&normalized) {
            return Err(RepoError::DuplicateEntityName(normalized));
        }
        self.constructors.insert(normalized, constructor);
        Ok(())
    }

    /// Registers `E` under its kind name.
    pub fn register_entity<E: Persistable>(&mut self) -> RepoResult<()> {
        self.register(E::KIND.name(), construct::<E>)
    }

    pub fn get(&self, name: &str) -> Option<Constructor> {
        self.constructors.get(&normalize_name(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&normalize_name(name))
    }

    /// Sorted registered names.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    fn insert_entity<E: Persistable>(&mut self) {
        self.constructors
            .insert(E::KIND.name().to_string(), construct::<E>);
    }
}

fn construct<'db, E: Persistable>(
    db: &'db QueryExecutor,
    row: &RowMap,
    in_db: bool,
) -> RepoResult<AnyRecord<'db>> {
    Record::<E>::from_row(db, row, in_db).map(E::into_any)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Turns entity-type names and rows into typed records.
#[derive(Clone)]
pub struct ObjectFactory {
    registry: Arc<Registry>,
}

impl Default for ObjectFactory {
    fn default() -> Self {
        Self::new(Registry::with_defaults())
    }
}

impl ObjectFactory {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Builds the record registered under `type_name`.
    ///
    /// # Errors
    /// - `UnknownEntityType` (carrying the name) when nothing is registered.
    /// - `Model` when `data` cannot populate the entity.
    pub fn create_instance<'db>(
        &self,
        type_name: &str,
        data: &RowMap,
        db: &'db QueryExecutor,
        in_db: bool,
    ) -> RepoResult<AnyRecord<'db>> {
        let Some(constructor) = self.registry.get(type_name) else {
            warn!(
                "event=factory_create module=repo status=error error_code=unknown_entity_type type_name={}",
                type_name.trim()
            );
            return Err(RepoError::UnknownEntityType(type_name.trim().to_string()));
        };
        constructor(db, data, in_db)
    }

    /// Builds a record of a statically known entity.
    pub fn create_typed<'db, E: Persistable>(
        &self,
        data: &RowMap,
        db: &'db QueryExecutor,
        in_db: bool,
    ) -> RepoResult<Record<'db, E>> {
        Record::from_row(db, data, in_db)
    }
}
