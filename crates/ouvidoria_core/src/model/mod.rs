//! Domain entities of the municipal ombudsman backend.
//!
//! # Responsibility
//! - Declare, per entity, the table, key fields and non-key fields that the
//!   generic persistence algorithms work from.
//! - Convert raw row mappings into typed entities and back into values.
//!
//! # Invariants
//! - `PK_FIELDS` is non-empty and never overlaps `NON_PK_FIELDS`.
//! - Every declared field maps to exactly one struct attribute.
//! - Table names are entity names upper-cased.

use crate::db::RowMap;
use rusqlite::types::{FromSql, Value, ValueRef};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

pub mod entities;

pub use entities::{
    Avaliacao, Cargo, Email, Funcionario, Localidade, Morador, Ocorrencia, OrgaoPublico, Servico,
    Telefone, TipoOcorrencia,
};

/// Every persisted entity kind, keyed by its public registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
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
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        Self::Morador,
        Self::Funcionario,
        Self::Cargo,
        Self::Email,
        Self::Telefone,
        Self::Localidade,
        Self::OrgaoPublico,
        Self::TipoOcorrencia,
        Self::Ocorrencia,
        Self::Servico,
        Self::Avaliacao,
    ];

    /// Lower-case registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Morador => "morador",
            Self::Funcionario => "funcionario",
            Self::Cargo => "cargo",
            Self::Email => "email",
            Self::Telefone => "telefone",
            Self::Localidade => "localidade",
            Self::OrgaoPublico => "orgao_publico",
            Self::TipoOcorrencia => "tipo_ocorrencia",
            Self::Ocorrencia => "ocorrencia",
            Self::Servico => "servico",
            Self::Avaliacao => "avaliacao",
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            Self::Morador => "MORADOR",
            Self::Funcionario => "FUNCIONARIO",
            Self::Cargo => "CARGO",
            Self::Email => "EMAIL",
            Self::Telefone => "TELEFONE",
            Self::Localidade => "LOCALIDADE",
            Self::OrgaoPublico => "ORGAO_PUBLICO",
            Self::TipoOcorrencia => "TIPO_OCORRENCIA",
            Self::Ocorrencia => "OCORRENCIA",
            Self::Servico => "SERVICO",
            Self::Avaliacao => "AVALIACAO",
        }
    }

    /// Primary-key columns declared by the entity of this kind.
    pub fn key_fields(self) -> &'static [&'static str] {
        match self {
            Self::Morador => Morador::PK_FIELDS,
            Self::Funcionario => Funcionario::PK_FIELDS,
            Self::Cargo => Cargo::PK_FIELDS,
            Self::Email => Email::PK_FIELDS,
            Self::Telefone => Telefone::PK_FIELDS,
            Self::Localidade => Localidade::PK_FIELDS,
            Self::OrgaoPublico => OrgaoPublico::PK_FIELDS,
            Self::TipoOcorrencia => TipoOcorrencia::PK_FIELDS,
            Self::Ocorrencia => Ocorrencia::PK_FIELDS,
            Self::Servico => Servico::PK_FIELDS,
            Self::Avaliacao => Avaliacao::PK_FIELDS,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| format!("unknown entity kind `{}`", value.trim()))
    }
}

/// How an entity obtains its primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The engine assigns the first key column on insert.
    Generated,
    /// The caller supplies the key; it is inserted with the other fields.
    Natural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    MissingField {
        entity: EntityKind,
        field: &'static str,
    },
    InvalidField {
        entity: EntityKind,
        field: &'static str,
        message: String,
    },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "{entity}: missing required field `{field}`")
            }
            Self::InvalidField {
                entity,
                field,
                message,
            } => write!(f, "{entity}: invalid value for `{field}`: {message}"),
        }
    }
}

impl Error for ModelError {}

pub type ModelResult<T> = Result<T, ModelError>;

/// Per-entity schema descriptor driving the generic insert/update/delete.
pub trait Entity: Debug + Clone + Sized {
    const KIND: EntityKind;
    const PK_FIELDS: &'static [&'static str];
    const NON_PK_FIELDS: &'static [&'static str];
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::Generated;

    fn table_name() -> &'static str {
        Self::KIND.table_name()
    }

    /// Builds the entity from a row mapping.
    ///
    /// When `in_db` is false a generated key is left unassigned whatever the
    /// mapping holds.
    fn from_row(row: &RowMap, in_db: bool) -> ModelResult<Self>;

    /// `(column, value)` pairs for `PK_FIELDS`, in declaration order.
    fn key_values(&self) -> Vec<(&'static str, Value)>;

    /// `(column, value)` pairs for `NON_PK_FIELDS`, in declaration order.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Writes an engine-assigned key onto the first key field.
    fn assign_key(&mut self, id: i64);

    /// Resets the key to unassigned. Natural keys are kept.
    fn clear_key(&mut self);

    /// Whether every key field holds a value.
    fn has_key(&self) -> bool {
        self.key_values()
            .iter()
            .all(|(_, value)| *value != Value::Null)
    }

    /// Full row mapping: key fields followed by non-key fields.
    fn to_row(&self) -> RowMap {
        self.key_values()
            .into_iter()
            .chain(self.field_values())
            .map(|(column, value)| (column.to_string(), value))
            .collect()
    }
}

/// Reads one typed field from a row mapping.
///
/// Column lookup falls back to a case-insensitive match. An absent column
/// reads as `NULL`, which only `Option` targets accept.
pub(crate) fn read_field<T: FromSql>(
    row: &RowMap,
    entity: EntityKind,
    field: &'static str,
) -> ModelResult<T> {
    let value = row.get(field).or_else(|| {
        row.iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    });

    match value {
        Some(value) => {
            T::column_result(ValueRef::from(value)).map_err(|err| ModelError::InvalidField {
                entity,
                field,
                message: err.to_string(),
            })
        }
        None => T::column_result(ValueRef::Null)
            .map_err(|_| ModelError::MissingField { entity, field }),
    }
}
