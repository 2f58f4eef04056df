//! Read-only projections of entities
//!
//! Two shapes are supported. A [`Projection`] is a concrete type declaring
//! the fields it reads and how to build itself from an entity. A
//! [`ProjectionSpec`] is a named field set evaluated at runtime into a
//! [`ProjectedRow`]. Both are validated against the entity descriptor before
//! a query runs, so a projection naming an unmapped field fails fast.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::descriptor::EntityDescriptor;
use super::entity::Entity;
use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;
use super::value::Value;

/// A narrower, typed view of `E`
///
/// # Example
///
/// ```rust,ignore
/// struct UsernameOnly {
///     username: String,
/// }
///
/// impl Projection<Member> for UsernameOnly {
///     const FIELDS: &'static [&'static str] = &["username"];
///
///     fn project(member: &Member) -> Self {
///         Self { username: member.username.clone() }
///     }
/// }
/// ```
pub trait Projection<E: Entity>: Sized + Send {
    /// Entity fields read by [`Projection::project`]
    const FIELDS: &'static [&'static str];

    /// Build the view from a loaded entity
    fn project(entity: &E) -> Self;

    /// Check that every field in [`Projection::FIELDS`] is mapped on `E`
    fn validate(operation: RepositoryOperation) -> RepositoryResult<()> {
        let descriptor = E::descriptor();
        for field in Self::FIELDS {
            descriptor.require_field(field, operation)?;
        }
        Ok(())
    }
}

/// A named set of fields to project at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSpec {
    name: String,
    fields: Vec<String>,
}

impl ProjectionSpec {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// A projection needs at least one field, and every field must be mapped
    pub fn validate(
        &self,
        descriptor: &EntityDescriptor,
        operation: RepositoryOperation,
    ) -> RepositoryResult<()> {
        if self.fields.is_empty() {
            return Err(RepositoryError::invalid_specification(
                operation,
                format!("projection `{}` selects no fields", self.name),
            ));
        }
        for field in &self.fields {
            descriptor.require_field(field, operation)?;
        }
        Ok(())
    }

    /// Read the selected fields of `entity`, in projection order
    pub fn apply<E: Entity>(&self, entity: &E) -> ProjectedRow {
        ProjectedRow {
            values: self
                .fields
                .iter()
                .map(|field| (field.clone(), entity.get(field)))
                .collect(),
        }
    }
}

/// Ordered `field -> value` pairs; serializes as a map
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedRow {
    values: Vec<(String, Value)>,
}

impl ProjectedRow {
    /// Value of `field`, if projected
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Projected field names in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<(String, Value)> {
        self.values
    }
}

impl Serialize for ProjectedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in &self.values {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryErrorKind;
    use crate::repository::fixtures::{Member, UsernameOnly};

    #[test]
    fn test_typed_projection() {
        let member = Member::new("AAA", 10);
        let view = UsernameOnly::project(&member);
        assert_eq!(view.username, "AAA");
        assert!(<UsernameOnly as Projection<Member>>::validate(RepositoryOperation::FindAll).is_ok());
    }

    #[test]
    fn test_field_set_projection_keeps_order() {
        let member = Member::new("AAA", 10);
        let spec = ProjectionSpec::new("summary", ["age", "username"]);
        spec.validate(Member::descriptor(), RepositoryOperation::FindAll)
            .unwrap();

        let row = spec.apply(&member);
        assert_eq!(row.fields().collect::<Vec<_>>(), ["age", "username"]);
        assert_eq!(row.get("username"), Some(&Value::from("AAA")));
        assert_eq!(row.get("team_id"), None);
        assert_eq!(row.len(), 2);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"age":10,"username":"AAA"}"#);
    }

    #[test]
    fn test_field_set_projection_validation() {
        let descriptor = Member::descriptor();
        let err = ProjectionSpec::new("broken", ["nickname"])
            .validate(descriptor, RepositoryOperation::FindAll)
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidSpecification);

        let empty: [&str; 0] = [];
        assert!(ProjectionSpec::new("empty", empty)
            .validate(descriptor, RepositoryOperation::FindAll)
            .is_err());
    }
}
