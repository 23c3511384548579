//! Concrete entity declarations.
//!
//! Entities with an engine-assigned key are declared through
//! `generated_key_entity!`; `Telefone` carries a natural key and is written
//! out by hand.

use super::{read_field, Entity, EntityKind, KeyStrategy, ModelResult};
use crate::db::RowMap;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

macro_rules! generated_key_entity {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:expr, key: $key:ident,
        fields { $( $(#[$field_meta:meta])* $field:ident: $ty:ty ),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            /// Engine-assigned key; `None` until the first insert.
            pub $key: Option<i64>,
            $( $(#[$field_meta])* pub $field: $ty, )*
        }

        impl Entity for $name {
            const KIND: EntityKind = $kind;
            const PK_FIELDS: &'static [&'static str] = &[stringify!($key)];
            const NON_PK_FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn from_row(row: &RowMap, in_db: bool) -> ModelResult<Self> {
                let $key = if in_db {
                    Some(read_field::<i64>(row, $kind, stringify!($key))?)
                } else {
                    None
                };
                Ok(Self {
                    $key,
                    $( $field: read_field(row, $kind, stringify!($field))?, )*
                })
            }

            fn key_values(&self) -> Vec<(&'static str, Value)> {
                vec![(stringify!($key), Value::from(self.$key))]
            }

            fn field_values(&self) -> Vec<(&'static str, Value)> {
                vec![$( (stringify!($field), Value::from(self.$field.clone())) ),*]
            }

            fn assign_key(&mut self, id: i64) {
                self.$key = Some(id);
            }

            fn clear_key(&mut self) {
                self.$key = None;
            }
        }
    };
}

generated_key_entity! {
    /// Resident who files occurrences and rates services.
    Morador => EntityKind::Morador, key: cod_morador,
    fields {
        endereco: Option<String>,
        cpf: String,
        /// ISO-8601 date.
        data_nasc: String,
    }
}

generated_key_entity! {
    /// Employee of a public agency.
    Funcionario => EntityKind::Funcionario, key: cod_func,
    fields {
        /// `ORGAO_PUBLICO.cod_orgao`.
        orgao_pub: i64,
        /// `CARGO.cod_cargo`.
        cargo: i64,
        cpf: String,
        data_nasc: String,
        inicio_contrato: String,
        fim_contrato: Option<String>,
    }
}

generated_key_entity! {
    /// Job title held by employees.
    Cargo => EntityKind::Cargo, key: cod_cargo,
    fields {
        nome: String,
        descricao: Option<String>,
    }
}

generated_key_entity! {
    /// Contact address owned by either an employee or a resident.
    Email => EntityKind::Email, key: cod_email,
    fields {
        cod_func: Option<i64>,
        cod_morador: Option<i64>,
        email: String,
    }
}

generated_key_entity! {
    Localidade => EntityKind::Localidade, key: cod_local,
    fields {
        estado: String,
        municipio: String,
        bairro: Option<String>,
        endereco: Option<String>,
    }
}

generated_key_entity! {
    /// Public agency responsible for services and occurrence types.
    OrgaoPublico => EntityKind::OrgaoPublico, key: cod_orgao,
    fields {
        nome: String,
        estado: String,
        descr: Option<String>,
        data_ini: String,
        data_fim: Option<String>,
    }
}

generated_key_entity! {
    TipoOcorrencia => EntityKind::TipoOcorrencia, key: cod_tipo,
    fields {
        orgao_pub: i64,
        nome: String,
        descr: Option<String>,
    }
}

generated_key_entity! {
    /// Complaint filed by a resident about a location.
    Ocorrencia => EntityKind::Ocorrencia, key: cod_oco,
    fields {
        cod_tipo: i64,
        cod_local: i64,
        cod_morador: i64,
        data: String,
        status: String,
    }
}

generated_key_entity! {
    /// Service delivered by an agency at a location.
    Servico => EntityKind::Servico, key: cod_servico,
    fields {
        cod_orgao: i64,
        cod_local: i64,
        nome: String,
        descr: Option<String>,
        inicio_servico: String,
        fim_servico: Option<String>,
    }
}

generated_key_entity! {
    /// Resident rating of a service.
    Avaliacao => EntityKind::Avaliacao, key: cod_aval,
    fields {
        cod_servico: i64,
        cod_morador: i64,
        nota_serv: i64,
        nota_tempo: i64,
        opiniao: Option<String>,
    }
}

/// Resident phone number. The number itself is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telefone {
    pub telefone: String,
    pub cod_morador: i64,
    /// Area code, stored in column `DDD`.
    #[serde(rename = "DDD")]
    pub ddd: String,
}

impl Entity for Telefone {
    const KIND: EntityKind = EntityKind::Telefone;
    const PK_FIELDS: &'static [&'static str] = &["telefone"];
    const NON_PK_FIELDS: &'static [&'static str] = &["cod_morador", "DDD"];
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::Natural;

    fn from_row(row: &RowMap, _in_db: bool) -> ModelResult<Self> {
        Ok(Self {
            telefone: read_field(row, Self::KIND, "telefone")?,
            cod_morador: read_field(row, Self::KIND, "cod_morador")?,
            ddd: read_field(row, Self::KIND, "DDD")?,
        })
    }

    fn key_values(&self) -> Vec<(&'static str, Value)> {
        vec![("telefone", Value::from(self.telefone.clone()))]
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("cod_morador", Value::from(self.cod_morador)),
            ("DDD", Value::from(self.ddd.clone())),
        ]
    }

    fn assign_key(&mut self, _id: i64) {}

    fn clear_key(&mut self) {}
}
