//! Active records: the insert/update/delete state machine.
//!
//! # Responsibility
//! - Synthesize `INSERT`, `UPDATE` and `DELETE` from an entity's declared
//!   key and non-key fields.
//! - Track the Transient -> Persisted -> Deleted lifecycle.
//!
//! # Invariants
//! - `update()` inserts when Transient or Deleted and updates when
//!   Persisted; it never commits.
//! - After an insert with a generated key, the engine-assigned key is
//!   written back onto the entity.
//! - `delete()` is only valid when Persisted; afterwards the key is
//!   unassigned and the record can be inserted again as a new row.

use super::{RepoError, RepoResult};
use crate::db::{NamedParams, QueryExecutor, RowMap};
use crate::model::{
    Avaliacao, Cargo, Email, Entity, EntityKind, Funcionario, KeyStrategy, Localidade, Morador,
    Ocorrencia, OrgaoPublico, Servico, Telefone, TipoOcorrencia,
};
use log::debug;
use rusqlite::types::Value;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};

/// Lifecycle state of one active record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never inserted; key unassigned.
    Transient,
    /// Backed by a row; key assigned.
    Persisted,
    /// Its row was deleted; key unassigned again.
    Deleted,
}

impl Display for RecordState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Persisted => f.write_str("persisted"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

/// Entity paired with the executor it persists through.
///
/// Cloning copies the entity and the lifecycle flags, not the row.
#[derive(Clone)]
pub struct Record<'db, E: Entity> {
    db: &'db QueryExecutor,
    entity: E,
    in_db: bool,
    deleted: bool,
}

impl<'db, E: Entity> Record<'db, E> {
    /// Wraps a not-yet-persisted entity. A generated key is cleared.
    pub fn new(db: &'db QueryExecutor, mut entity: E) -> Self {
        if E::KEY_STRATEGY == KeyStrategy::Generated {
            entity.clear_key();
        }
        Self {
            db,
            entity,
            in_db: false,
            deleted: false,
        }
    }

    /// Builds a record from a row mapping; `in_db` marks it Persisted.
    pub fn from_row(db: &'db QueryExecutor, row: &RowMap, in_db: bool) -> RepoResult<Self> {
        let entity = E::from_row(row, in_db)?;
        Ok(Self {
            db,
            entity,
            in_db,
            deleted: false,
        })
    }

    pub fn state(&self) -> RecordState {
        match (self.in_db, self.deleted) {
            (true, _) => RecordState::Persisted,
            (false, true) => RecordState::Deleted,
            (false, false) => RecordState::Transient,
        }
    }

    pub fn in_db(&self) -> bool {
        self.in_db
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    /// Inserts when not persisted, otherwise updates the existing row.
    ///
    /// # Errors
    /// - `Db` when the statement fails.
    /// - `NotFound` when a Persisted record no longer matches a row.
    pub fn update(&mut self) -> RepoResult<()> {
        if self.in_db {
            self.update_in_db()
        } else {
            self.insert_in_db()
        }
    }

    /// Deletes the backing row and resets the key.
    ///
    /// # Errors
    /// - `InvalidState` when the record is not Persisted.
    /// - `NotFound` when no row matched the key.
    pub fn delete(&mut self) -> RepoResult<()> {
        if !self.in_db {
            return Err(RepoError::InvalidState {
                kind: E::KIND,
                state: self.state(),
                operation: "delete",
            });
        }
        self.require_key("delete")?;

        let keys = self.entity.key_values();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            E::table_name(),
            assignments(&keys, " AND ")
        );

        let affected = self.db.write(&sql, &to_params(&keys))?;
        if affected == 0 {
            return Err(self.not_found(&keys));
        }

        debug!(
            "event=record_delete module=repo status=ok entity={} key={}",
            E::KIND,
            describe_key(&keys)
        );
        self.entity.clear_key();
        self.in_db = false;
        self.deleted = true;
        Ok(())
    }

    fn insert_in_db(&mut self) -> RepoResult<()> {
        let mut columns = Vec::new();
        if E::KEY_STRATEGY == KeyStrategy::Natural {
            columns.extend(self.entity.key_values());
        }
        columns.extend(self.entity.field_values());

        let names: Vec<&str> = columns.iter().map(|(column, _)| *column).collect();
        let placeholders: Vec<String> = names.iter().map(|column| format!(":{column}")).collect();
        let sql = format!(
            "INSERT INTO {} ( {} ) VALUES ( {} )",
            E::table_name(),
            names.join(", "),
            placeholders.join(", ")
        );

        self.db.write(&sql, &to_params(&columns))?;

        if E::KEY_STRATEGY == KeyStrategy::Generated {
            let id = self.db.last_insert_id();
            self.entity.assign_key(id);
        }
        self.in_db = true;
        self.deleted = false;

        debug!(
            "event=record_insert module=repo status=ok entity={} key={}",
            E::KIND,
            describe_key(&self.entity.key_values())
        );
        Ok(())
    }

    fn update_in_db(&mut self) -> RepoResult<()> {
        self.require_key("update")?;
        let fields = self.entity.field_values();
        let keys = self.entity.key_values();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            E::table_name(),
            assignments(&fields, ", "),
            assignments(&keys, " AND ")
        );

        let mut params = to_params(&fields);
        params.extend(to_params(&keys));

        let affected = self.db.write(&sql, &params)?;
        if affected == 0 {
            return Err(self.not_found(&keys));
        }

        debug!(
            "event=record_update module=repo status=ok entity={} key={}",
            E::KIND,
            describe_key(&keys)
        );
        Ok(())
    }

    /// A Persisted record must carry its whole key before it can address
    /// its row.
    fn require_key(&self, operation: &str) -> RepoResult<()> {
        if self.entity.has_key() {
            return Ok(());
        }
        Err(RepoError::InvalidData(format!(
            "cannot {operation} persisted {} record without a key",
            E::KIND
        )))
    }

    fn not_found(&self, keys: &[(&'static str, Value)]) -> RepoError {
        RepoError::NotFound {
            kind: E::KIND,
            key: describe_key(keys),
        }
    }
}

impl<E: Entity> Deref for Record<'_, E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl<E: Entity> DerefMut for Record<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entity
    }
}

impl<E: Entity> Debug for Record<'_, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("state", &self.state())
            .field("entity", &self.entity)
            .finish()
    }
}

/// `column = :column` pairs joined by `separator`.
fn assignments(columns: &[(&'static str, Value)], separator: &str) -> String {
    columns
        .iter()
        .map(|(column, _)| format!("{column} = :{column}"))
        .collect::<Vec<_>>()
        .join(separator)
}

fn to_params(columns: &[(&'static str, Value)]) -> NamedParams {
    columns
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}

fn describe_key(keys: &[(&'static str, Value)]) -> String {
    keys.iter()
        .map(|(column, value)| match value {
            Value::Null => format!("{column}=NULL"),
            Value::Integer(number) => format!("{column}={number}"),
            Value::Real(number) => format!("{column}={number}"),
            Value::Text(text) => format!("{column}={text}"),
            Value::Blob(bytes) => format!("{column}=<{} bytes>", bytes.len()),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Typed conversion between [`Record`] and [`AnyRecord`].
pub trait Persistable: Entity + serde::Serialize {
    fn into_any(record: Record<'_, Self>) -> AnyRecord<'_>;

    /// Returns the record back unchanged when it holds another kind.
    fn from_any(record: AnyRecord<'_>) -> Result<Record<'_, Self>, AnyRecord<'_>>;

    fn ref_any<'a, 'db>(record: &'a AnyRecord<'db>) -> Option<&'a Record<'db, Self>>;

    fn mut_any<'a, 'db>(record: &'a mut AnyRecord<'db>) -> Option<&'a mut Record<'db, Self>>;
}

macro_rules! any_record {
    ($($variant:ident),* $(,)?) => {
        /// A record of any registered entity kind.
        #[derive(Debug, Clone)]
        pub enum AnyRecord<'db> {
            $( $variant(Record<'db, $variant>), )*
        }

        impl<'db> AnyRecord<'db> {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $( Self::$variant(_) => <$variant as Entity>::KIND, )*
                }
            }

            pub fn state(&self) -> RecordState {
                match self {
                    $( Self::$variant(record) => record.state(), )*
                }
            }

            /// See [`Record::update`].
            pub fn update(&mut self) -> RepoResult<()> {
                match self {
                    $( Self::$variant(record) => record.update(), )*
                }
            }

            /// See [`Record::delete`].
            pub fn delete(&mut self) -> RepoResult<()> {
                match self {
                    $( Self::$variant(record) => record.delete(), )*
                }
            }

            pub fn key_values(&self) -> Vec<(&'static str, Value)> {
                match self {
                    $( Self::$variant(record) => record.entity().key_values(), )*
                }
            }

            /// Plain column mapping of the current attribute values.
            pub fn to_row(&self) -> RowMap {
                match self {
                    $( Self::$variant(record) => record.entity().to_row(), )*
                }
            }

            /// JSON object of the entity attributes.
            pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
                match self {
                    $( Self::$variant(record) => serde_json::to_value(record.entity()), )*
                }
            }

            pub fn downcast<E: Persistable>(self) -> Result<Record<'db, E>, Self> {
                E::from_any(self)
            }

            pub fn downcast_ref<E: Persistable>(&self) -> Option<&Record<'db, E>> {
                E::ref_any(self)
            }

            pub fn downcast_mut<E: Persistable>(&mut self) -> Option<&mut Record<'db, E>> {
                E::mut_any(self)
            }
        }

        $(
            impl Persistable for $variant {
                fn into_any(record: Record<'_, Self>) -> AnyRecord<'_> {
                    AnyRecord::$variant(record)
                }

                fn from_any(record: AnyRecord<'_>) -> Result<Record<'_, Self>, AnyRecord<'_>> {
                    match record {
                        AnyRecord::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }

                fn ref_any<'a, 'db>(record: &'a AnyRecord<'db>) -> Option<&'a Record<'db, Self>> {
                    match record {
                        AnyRecord::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn mut_any<'a, 'db>(
                    record: &'a mut AnyRecord<'db>,
                ) -> Option<&'a mut Record<'db, Self>> {
                    match record {
                        AnyRecord::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl<'db> From<Record<'db, $variant>> for AnyRecord<'db> {
                fn from(record: Record<'db, $variant>) -> Self {
                    AnyRecord::$variant(record)
                }
            }
        )*
    };
}

any_record!(
    Morador,
    Funcionario,
    Cargo,
    Email,
    Telefone,
    Localidade,
    OrgaoPublico,
    TipoOcorrencia,
    Ocorrencia,
    Servico,
    Avaliacao,
);

#[cfg(test)]
mod tests {
    use super::{assignments, describe_key, AnyRecord, Record, RecordState};
    use crate::db::open_db_in_memory;
    use crate::model::{Cargo, EntityKind, Localidade};
    use crate::repo::RepoError;
    use rusqlite::types::Value;

    #[test]
    fn assignments_join_columns_with_placeholders() {
        let columns = [
            ("nome", Value::Null),
            ("descricao", Value::Null),
        ];
        assert_eq!(
            assignments(&columns, ", "),
            "nome = :nome, descricao = :descricao"
        );
        assert_eq!(
            describe_key(&[("cod_cargo", Value::Integer(3))]),
            "cod_cargo=3"
        );
    }

    #[test]
    fn new_record_is_transient_with_cleared_key() {
        let db = open_db_in_memory().unwrap();
        let record = Record::new(
            &db,
            Cargo {
                cod_cargo: Some(99),
                nome: "Manager".into(),
                descricao: None,
            },
        );
        assert_eq!(record.state(), RecordState::Transient);
        assert_eq!(record.cod_cargo, None);
    }

    #[test]
    fn delete_on_transient_record_fails_fast() {
        let db = open_db_in_memory().unwrap();
        let mut record = Record::new(
            &db,
            Localidade {
                cod_local: None,
                estado: "DF".into(),
                municipio: "Brasilia".into(),
                bairro: None,
                endereco: None,
            },
        );

        let err = record.delete().unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidState {
                kind: EntityKind::Localidade,
                state: RecordState::Transient,
                operation: "delete",
            }
        ));
        assert!(!db.has_pending_writes());
    }

    #[test]
    fn persisted_record_without_key_issues_no_sql() {
        let db = open_db_in_memory().unwrap();
        db.create_schema_from_script(None).unwrap();
        let mut record = Record::new(
            &db,
            Cargo {
                cod_cargo: None,
                nome: "Clerk".into(),
                descricao: None,
            },
        );
        record.update().unwrap();
        db.commit().unwrap();

        record.cod_cargo = None;
        assert_eq!(record.state(), RecordState::Persisted);
        for err in [record.update().unwrap_err(), record.delete().unwrap_err()] {
            assert!(matches!(
                err,
                RepoError::InvalidData(message) if message.contains("without a key")
            ));
        }
        assert!(!db.has_pending_writes());
    }

    #[test]
    fn any_record_downcasts_to_its_own_kind_only() {
        let db = open_db_in_memory().unwrap();
        let any: AnyRecord<'_> = Record::new(
            &db,
            Cargo {
                cod_cargo: None,
                nome: "Clerk".into(),
                descricao: None,
            },
        )
        .into();

        assert_eq!(any.kind(), EntityKind::Cargo);
        assert!(any.downcast_ref::<Localidade>().is_none());
        let any = any.downcast::<Localidade>().unwrap_err();
        let cargo = any.downcast::<Cargo>().unwrap();
        assert_eq!(cargo.nome, "Clerk");
    }
}
