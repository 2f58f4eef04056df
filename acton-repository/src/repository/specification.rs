//! Storage-agnostic query intent
//!
//! A [`QuerySpecification`] bundles AND-combined predicates, ordering, an
//! optional offset/limit window, a row cap and [`QueryHints`]. It is built per
//! call, validated against the entity's descriptor before storage is touched,
//! and discarded after execution.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::{
//!     FilterCondition, LockMode, Order, QuerySpecification,
//! };
//!
//! let spec = QuerySpecification::new()
//!     .with_filter(FilterCondition::eq("username", "BBB"))
//!     .with_filter(FilterCondition::gt("age", 15_i64))
//!     .with_order(Order::desc("age"))
//!     .with_lock(LockMode::PessimisticWrite);
//!
//! assert_eq!(spec.predicates.len(), 2);
//! assert_eq!(spec.hints.lock, Some(LockMode::PessimisticWrite));
//! ```

use std::fmt;

use super::descriptor::EntityDescriptor;
use super::entity::{Entity, EntityId};
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::FilterCondition;
use super::page::{Order, Pagination, Sort};
use super::traits::RepositoryResult;
use super::value::Value;

/// Pessimistic lock intent forwarded to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock (`FOR SHARE`)
    PessimisticRead,
    /// Exclusive lock (`FOR UPDATE`)
    PessimisticWrite,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PessimisticRead => write!(f, "pessimistic_read"),
            Self::PessimisticWrite => write!(f, "pessimistic_write"),
        }
    }
}

/// Execution hints; storage may honor or ignore them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHints {
    /// Lock intent; lock lifetime belongs to the caller's transaction
    pub lock: Option<LockMode>,
    /// Results will not be modified
    pub read_only: bool,
    /// Relations the caller intends to load
    pub fetch: Vec<String>,
}

/// Filter, ordering and window for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpecification {
    /// Predicates, combined with AND
    pub predicates: Vec<FilterCondition>,
    /// Ordering; earlier orders take precedence
    pub sort: Sort,
    /// Offset/limit applied after `max_results`
    pub window: Option<Pagination>,
    /// Cap on the number of matching rows (`Top`/`First` queries)
    pub max_results: Option<u64>,
    /// Drop duplicate rows
    pub distinct: bool,
    /// Execution hints
    pub hints: QueryHints,
}

impl QuerySpecification {
    /// Match every row, unordered
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the row with the given identifier
    pub fn by_id<E: Entity>(id: &E::Id) -> Self {
        Self::new().with_filter(FilterCondition::eq(
            E::descriptor().id_field(),
            id.to_value(),
        ))
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterCondition) -> Self {
        self.predicates.push(filter);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FilterCondition>) -> Self {
        self.predicates.extend(filters);
        self
    }

    /// Append an order after the existing ones
    #[must_use]
    pub fn with_order(mut self, order: Order) -> Self {
        self.sort = self.sort.and(Sort::from_orders(vec![order]));
        self
    }

    /// Replace the ordering
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: Pagination) -> Self {
        self.window = Some(window);
        self
    }

    /// Cap the number of matching rows
    #[must_use]
    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: LockMode) -> Self {
        self.hints.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.hints.read_only = true;
        self
    }

    /// Record a relation the caller will load
    #[must_use]
    pub fn with_fetch(mut self, relation: impl Into<String>) -> Self {
        self.hints.fetch.push(relation.into());
        self
    }

    /// Check every referenced field and operand against `descriptor`
    pub fn validate(
        &self,
        descriptor: &EntityDescriptor,
        operation: RepositoryOperation,
    ) -> RepositoryResult<()> {
        for predicate in &self.predicates {
            predicate.validate(descriptor, operation)?;
        }
        for order in self.sort.orders() {
            descriptor.require_field(&order.property, operation)?;
        }
        if let Some(window) = &self.window {
            if window.limit == 0 {
                return Err(RepositoryError::invalid_specification(
                    operation,
                    "window limit must be greater than zero",
                ));
            }
        }
        for relation in &self.hints.fetch {
            if descriptor.relation(relation).is_none() {
                return Err(RepositoryError::invalid_specification(
                    operation,
                    format!("unknown relation `{relation}` on {}", descriptor.entity_name()),
                ));
            }
        }
        Ok(())
    }

    /// Whether `entity` satisfies every predicate
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(&entity.get(&predicate.field)))
    }
}

impl fmt::Display for QuerySpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            write!(f, "all")?;
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{predicate}")?;
        }
        if self.sort.is_sorted() {
            write!(f, " ORDER BY {}", self.sort)?;
        }
        if let Some(max) = self.max_results {
            write!(f, " MAX {max}")?;
        }
        if let Some(window) = &self.window {
            write!(f, " OFFSET {} LIMIT {}", window.offset, window.limit)?;
        }
        Ok(())
    }
}

/// In-place change applied by a bulk update
///
/// ```rust
/// use acton_repository::repository::FieldUpdate;
///
/// let bump = FieldUpdate::increment("age", 1);
/// assert_eq!(bump.field(), "age");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// `field = value`
    Set {
        /// Field to write
        field: String,
        /// New value
        value: Value,
    },
    /// `field = field + delta`
    Increment {
        /// Numeric field to change
        field: String,
        /// Amount to add (may be negative)
        delta: i64,
    },
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self::Increment {
            field: field.into(),
            delta,
        }
    }

    /// Target field
    pub fn field(&self) -> &str {
        match self {
            Self::Set { field, .. } | Self::Increment { field, .. } => field,
        }
    }

    /// The identifier field cannot be updated in place
    pub fn validate(&self, descriptor: &EntityDescriptor) -> RepositoryResult<()> {
        let field = self.field();
        descriptor.require_field(field, RepositoryOperation::BulkUpdate)?;
        if field == descriptor.id_field() {
            return Err(RepositoryError::invalid_specification(
                RepositoryOperation::BulkUpdate,
                format!("identifier field `{field}` cannot be updated"),
            ));
        }
        Ok(())
    }

    /// Apply to one entity
    pub fn apply<E: Entity>(&self, entity: &mut E) -> RepositoryResult<()> {
        match self {
            Self::Set { field, value } => entity.set(field, value.clone()),
            Self::Increment { field, delta } => {
                let next = match entity.get(field) {
                    Value::Integer(n) => Value::Integer(n.saturating_add(*delta)),
                    #[allow(clippy::cast_precision_loss)]
                    Value::Float(n) => Value::Float(n + *delta as f64),
                    other => {
                        return Err(RepositoryError::invalid_specification(
                            RepositoryOperation::BulkUpdate,
                            format!("cannot increment {} field `{field}`", other.type_name()),
                        ))
                    }
                };
                entity.set(field, next)
            }
        }
    }
}
