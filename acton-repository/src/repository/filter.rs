//! Filter predicates for repository queries
//!
//! A [`FilterCondition`] is a single `(field, operator, value)` predicate.
//! Predicates in a [`QuerySpecification`](super::QuerySpecification) are
//! combined with AND.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::{FilterCondition, FilterOperator, Value};
//!
//! let filters = vec![
//!     FilterCondition::eq("username", "BBB"),
//!     FilterCondition::gt("age", 15_i64),
//!     FilterCondition::in_list("username", ["AAA", "BBB"]),
//! ];
//!
//! assert!(filters[1].matches(&Value::Integer(20)));
//! assert_eq!(filters[2].operator, FilterOperator::In);
//! ```

use std::cmp::Ordering;
use std::fmt;

use super::descriptor::EntityDescriptor;
use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;
use super::value::Value;

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use acton_repository::repository::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), ">=");
/// assert_eq!(FilterOperator::In.code(), "IN");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Value is in a list (IN)
    In,
}

impl FilterOperator {
    /// Short operator code (EQ, GT, LT, GTE, LTE, IN)
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Equal => "EQ",
            Self::GreaterThan => "GT",
            Self::GreaterThanOrEqual => "GTE",
            Self::LessThan => "LT",
            Self::LessThanOrEqual => "LTE",
            Self::In => "IN",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::In => write!(f, "IN"),
        }
    }
}

/// A single filter condition for querying entities
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: Value,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Equal, value)
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value)
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value)
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThan, value)
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value)
    }

    /// Create an IN list filter
    ///
    /// ```rust
    /// use acton_repository::repository::{FilterCondition, Value};
    ///
    /// let filter = FilterCondition::in_list("id", [1_i64, 2, 3]);
    /// assert!(filter.matches(&Value::Integer(2)));
    /// assert!(!filter.matches(&Value::Integer(4)));
    /// ```
    pub fn in_list<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            FilterOperator::In,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Evaluate this predicate against a field value
    ///
    /// Comparisons against `Null` or an incomparable type never match.
    pub fn matches(&self, actual: &Value) -> bool {
        match self.operator {
            FilterOperator::Equal => actual.compare(&self.value) == Some(Ordering::Equal),
            FilterOperator::GreaterThan => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOperator::GreaterThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::In => self.value.as_list().is_some_and(|candidates| {
                candidates
                    .iter()
                    .any(|candidate| actual.compare(candidate) == Some(Ordering::Equal))
            }),
        }
    }

    /// Check that the field exists and the operand fits the operator
    pub fn validate(
        &self,
        descriptor: &EntityDescriptor,
        operation: RepositoryOperation,
    ) -> RepositoryResult<()> {
        descriptor.require_field(&self.field, operation)?;
        let well_typed = match (self.operator, &self.value) {
            (FilterOperator::In, Value::List(_)) => true,
            (FilterOperator::In, _) | (_, Value::List(_) | Value::Null) => false,
            _ => true,
        };
        if well_typed {
            Ok(())
        } else {
            Err(RepositoryError::invalid_specification(
                operation,
                format!(
                    "operator {} on `{}` cannot take a {} operand",
                    self.operator.code(),
                    self.field,
                    self.value.type_name()
                ),
            )
            .with_entity(descriptor.entity_name(), self.field.clone()))
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}
