//! Entity contract and identifier generation
//!
//! An [`Entity`] exposes its descriptor, its identifier and its persisted
//! fields as [`Value`]s. New-entity detection follows the persistable
//! pattern: by default an entity is new when its identifier is unset, and
//! entities with externally assigned identifiers override
//! [`Entity::is_new`] (usually "creation timestamp is unset") so that saving
//! them never needs an existence check against storage.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};

use uuid::Uuid;

use super::descriptor::EntityDescriptor;
use super::traits::RepositoryResult;
use super::value::Value;

/// Identifier types usable as entity keys
pub trait EntityId: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Convert into a predicate operand
    fn to_value(&self) -> Value;

    /// Recover an identifier from a stored field value (foreign keys)
    fn from_value(value: &Value) -> Option<Self>;
}

impl EntityId for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl EntityId for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl EntityId for Uuid {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// A record type with a unique identifier, mapped to storage
///
/// # Example
///
/// ```rust
/// use acton_repository::repository::{Entity, EntityDescriptor, RepositoryResult, Value};
/// use std::sync::LazyLock;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Team {
///     id: Option<i64>,
///     name: String,
/// }
///
/// static TEAM: LazyLock<EntityDescriptor> =
///     LazyLock::new(|| EntityDescriptor::builder("Team", "id").field("name").build());
///
/// impl Entity for Team {
///     type Id = i64;
///
///     fn descriptor() -> &'static EntityDescriptor {
///         &TEAM
///     }
///
///     fn id(&self) -> Option<&i64> {
///         self.id.as_ref()
///     }
///
///     fn set_id(&mut self, id: i64) {
///         self.id = Some(id);
///     }
///
///     fn get(&self, field: &str) -> Value {
///         match field {
///             "id" => self.id.into(),
///             "name" => self.name.as_str().into(),
///             _ => Value::Null,
///         }
///     }
///
///     fn set(&mut self, field: &str, value: Value) -> RepositoryResult<()> {
///         if field == "name" {
///             self.name = value.as_str().unwrap_or_default().to_string();
///         }
///         Ok(())
///     }
/// }
///
/// let team = Team { id: None, name: "teamA".into() };
/// assert!(team.is_new());
/// assert_eq!(team.get("name"), Value::from("teamA"));
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type
    type Id: EntityId;

    /// Metadata shared by every instance of this type
    fn descriptor() -> &'static EntityDescriptor;

    /// Current identifier, if assigned
    fn id(&self) -> Option<&Self::Id>;

    /// Assign the identifier
    fn set_id(&mut self, id: Self::Id);

    /// Read a persisted field; unknown or unset fields read as `Null`
    fn get(&self, field: &str) -> Value;

    /// Write a persisted field (used by bulk updates and storage stamping)
    fn set(&mut self, field: &str, value: Value) -> RepositoryResult<()>;

    /// Whether saving this entity must insert rather than merge
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

/// Source of identifiers for entities saved without one
pub trait IdGenerator<Id>: Send + Sync {
    /// Produce the next identifier, or `None` when identifiers must be assigned by the caller
    fn next_id(&self) -> Option<Id>;
}

/// Monotonic integer identifiers
#[derive(Debug)]
pub struct SequenceGenerator {
    next: AtomicI64,
}

impl SequenceGenerator {
    /// Start the sequence at `start`
    pub const fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator<i64> for SequenceGenerator {
    fn next_id(&self) -> Option<i64> {
        Some(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Time-ordered UUIDv7 identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl IdGenerator<Uuid> for UuidV7Generator {
    fn next_id(&self) -> Option<Uuid> {
        Some(Uuid::now_v7())
    }
}

/// Identifiers are always supplied by the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignedIdentifiers;

impl<Id> IdGenerator<Id> for AssignedIdentifiers {
    fn next_id(&self) -> Option<Id> {
        None
    }
}
