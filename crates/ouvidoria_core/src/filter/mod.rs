//! Filters: an entity name plus an ordered predicate list.
//!
//! # Responsibility
//! - Hold the predicates a collector turns into one `SELECT`.
//! - Reject identifiers that cannot be interpolated into SQL text.
//!
//! # Invariants
//! - Predicate order is preserved and is significant.
//! - At most one value-binding predicate per field name; placeholders are
//!   keyed by field name and would otherwise shadow each other.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod predicate;

pub use predicate::{render_predicates, CompareOp, Logic, Predicate, SortDirection};

use crate::db::NamedParams;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern must compile"));

/// Returns whether `value` can be used verbatim as a table or column name.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidIdentifier(String),
    /// Two value-binding predicates target the same field.
    DuplicateField(String),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::DuplicateField(field) => write!(
                f,
                "field `{field}` is bound by more than one predicate in the same filter"
            ),
        }
    }
}

impl Error for FilterError {}

pub type FilterResult<T> = Result<T, FilterError>;

/// Ordered predicates bound to one entity-type name.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    object_type: String,
    params: Vec<Predicate>,
}

impl Filter {
    /// Validates and builds a filter.
    ///
    /// # Errors
    /// - `InvalidIdentifier` when the entity name or any field is not a plain
    ///   SQL identifier.
    /// - `DuplicateField` when two comparisons bind the same field.
    pub fn new(object_type: impl Into<String>, params: Vec<Predicate>) -> FilterResult<Self> {
        let object_type = object_type.into().trim().to_string();
        if !is_valid_identifier(&object_type) {
            return Err(FilterError::InvalidIdentifier(object_type));
        }

        let mut bound = BTreeSet::new();
        for predicate in &params {
            let Some(field) = predicate.field() else {
                continue;
            };
            if !is_valid_identifier(field) {
                return Err(FilterError::InvalidIdentifier(field.to_string()));
            }
            if predicate.binds_value() && !bound.insert(field.to_ascii_lowercase()) {
                return Err(FilterError::DuplicateField(field.to_string()));
            }
        }

        Ok(Self {
            object_type,
            params,
        })
    }

    /// Filter with no predicates: selects every row.
    pub fn all(object_type: impl Into<String>) -> FilterResult<Self> {
        Self::new(object_type, Vec::new())
    }

    /// Entity-type name as supplied.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn params(&self) -> &[Predicate] {
        &self.params
    }

    /// Renders the predicate tail and merged bind parameters.
    pub fn render(&self) -> (String, NamedParams) {
        render_predicates(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_identifier, Filter, FilterError, Predicate, SortDirection};
    use rusqlite::types::Value;

    #[test]
    fn identifiers_allow_only_word_characters() {
        assert!(is_valid_identifier("cod_local"));
        assert!(is_valid_identifier("DDD"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("nome; DROP TABLE CARGO"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn keeps_predicates_in_order() {
        let params = vec![
            Predicate::open_group(),
            Predicate::equal_to("nome", Value::Text("Manager".into())),
            Predicate::like("descricao", Value::Text("%things".into())).or(),
            Predicate::close_group(),
            Predicate::order_by("nome", SortDirection::Asc),
        ];
        let filter = Filter::new("cargo", params.clone()).unwrap();
        assert_eq!(filter.object_type(), "cargo");
        assert_eq!(filter.params(), params.as_slice());

        let (sql, bound) = filter.render();
        assert_eq!(
            sql,
            "( AND nome = :nome OR descricao LIKE :descricao ) ORDER BY nome ASC"
        );
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn rejects_two_comparisons_on_one_field() {
        let err = Filter::new(
            "servico",
            vec![
                Predicate::greater("inicio_servico", Value::Text("2024-01-01".into())),
                Predicate::less_than("inicio_servico", Value::Text("2024-12-31".into())),
            ],
        )
        .unwrap_err();
        assert_eq!(err, FilterError::DuplicateField("inicio_servico".into()));
    }

    #[test]
    fn ordering_on_a_filtered_field_is_allowed() {
        let filter = Filter::new(
            "cargo",
            vec![
                Predicate::equal_to("nome", Value::Text("Manager".into())),
                Predicate::order_by("nome", SortDirection::Desc),
            ],
        );
        assert!(filter.is_ok());
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(matches!(
            Filter::all("cargo; DROP TABLE CARGO"),
            Err(FilterError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Filter::new("cargo", vec![Predicate::equal_to("nome = 1 --", 1_i64)]),
            Err(FilterError::InvalidIdentifier(_))
        ));
    }
}
