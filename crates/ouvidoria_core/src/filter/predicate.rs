//! Composable WHERE / ORDER BY predicates.
//!
//! # Invariants
//! - Predicates are immutable values; `render()` is pure and repeatable.
//! - A value-binding predicate binds under its own field name, so two of
//!   them on one field share a single placeholder value.

use crate::db::NamedParams;
use rusqlite::types::Value;
use std::fmt::{Display, Formatter};

/// Boolean combinator prefixed to a comparison fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Display for Logic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// Sort direction for [`Predicate::OrderBy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// Comparison operator of a value-binding predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    EqualTo,
    Greater,
    LessThan,
    /// Wildcards follow the engine's `LIKE` rules.
    Like,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::EqualTo => "=",
            Self::Greater => ">",
            Self::LessThan => "<",
            Self::Like => "LIKE",
        }
    }
}

/// One unit of a filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `<logic> field <op> :field`
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
        logic: Logic,
    },
    /// `ORDER BY field <direction>`. Only valid as the last predicate of a
    /// sequence; placement is the caller's job.
    OrderBy {
        field: String,
        direction: SortDirection,
    },
    /// Literal `(`.
    OpenGroup,
    /// Literal `)`.
    CloseGroup,
}

impl Predicate {
    pub fn equal_to(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::EqualTo, value)
    }

    pub fn greater(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Greater, value)
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::LessThan, value)
    }

    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Like, value)
    }

    pub fn order_by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self::OrderBy {
            field: field.into(),
            direction,
        }
    }

    pub fn open_group() -> Self {
        Self::OpenGroup
    }

    pub fn close_group() -> Self {
        Self::CloseGroup
    }

    /// Comparison with `AND` as combinator.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
            logic: Logic::And,
        }
    }

    /// Same predicate joined with `OR`. Non-comparison predicates are
    /// returned unchanged.
    pub fn or(self) -> Self {
        self.with_logic(Logic::Or)
    }

    /// Same predicate joined with `AND`.
    pub fn and(self) -> Self {
        self.with_logic(Logic::And)
    }

    pub fn with_logic(self, logic: Logic) -> Self {
        match self {
            Self::Compare {
                field, op, value, ..
            } => Self::Compare {
                field,
                op,
                value,
                logic,
            },
            other => other,
        }
    }

    /// Field referenced by this predicate, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Compare { field, .. } | Self::OrderBy { field, .. } => Some(field),
            Self::OpenGroup | Self::CloseGroup => None,
        }
    }

    /// Whether rendering contributes a bind parameter.
    pub fn binds_value(&self) -> bool {
        matches!(self, Self::Compare { .. })
    }

    /// Renders the SQL fragment and its bind parameters.
    pub fn render(&self) -> (String, NamedParams) {
        match self {
            Self::Compare {
                field,
                op,
                value,
                logic,
            } => (
                format!("{logic} {field} {} :{field}", op.symbol()),
                NamedParams::from([(field.clone(), value.clone())]),
            ),
            Self::OrderBy { field, direction } => {
                (format!("ORDER BY {field} {direction}"), NamedParams::new())
            }
            Self::OpenGroup => ("(".to_string(), NamedParams::new()),
            Self::CloseGroup => (")".to_string(), NamedParams::new()),
        }
    }
}

/// Renders a predicate sequence in order.
///
/// Fragments are space-joined. Parameter maps are merged left to right, so
/// a later predicate on the same field overwrites the earlier value.
pub fn render_predicates(predicates: &[Predicate]) -> (String, NamedParams) {
    let mut fragments = Vec::with_capacity(predicates.len());
    let mut params = NamedParams::new();

    for predicate in predicates {
        let (fragment, bound) = predicate.render();
        fragments.push(fragment);
        params.extend(bound);
    }

    (fragments.join(" "), params)
}
