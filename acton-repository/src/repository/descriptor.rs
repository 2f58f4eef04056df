//! Entity metadata
//!
//! An [`EntityDescriptor`] names an entity type, its identifier field and the
//! set of persisted fields. Descriptors are built once (typically in a
//! `std::sync::LazyLock` static behind [`Entity::descriptor`](super::Entity::descriptor))
//! and never change afterwards.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::EntityDescriptor;
//!
//! let member = EntityDescriptor::builder("Member", "id")
//!     .fields(["username", "age"])
//!     .relation("team", "team_id", "Team")
//!     .build();
//!
//! assert!(member.has_field("username"));
//! assert!(member.has_field("team_id"));
//! assert_eq!(member.relation("team").map(|r| r.target.as_str()), Some("Team"));
//! ```

use super::error::RepositoryError;
use super::error::RepositoryOperation;
use super::traits::RepositoryResult;

/// A to-one association expressed as a foreign-key field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Relation name used by callers (e.g. "team")
    pub name: String,
    /// Field on the owning entity holding the related identifier
    pub foreign_key: String,
    /// Entity name of the related type
    pub target: String,
}

/// Immutable metadata describing a mapped entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    entity_name: String,
    id_field: String,
    fields: Vec<String>,
    created_at_field: Option<String>,
    version_field: Option<String>,
    unique_fields: Vec<String>,
    relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    /// Start describing an entity
    pub fn builder(
        entity_name: impl Into<String>,
        id_field: impl Into<String>,
    ) -> EntityDescriptorBuilder {
        let id_field = id_field.into();
        EntityDescriptorBuilder {
            descriptor: Self {
                entity_name: entity_name.into(),
                fields: vec![id_field.clone()],
                id_field,
                created_at_field: None,
                version_field: None,
                unique_fields: Vec::new(),
                relations: Vec::new(),
            },
        }
    }

    /// Entity type name
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Name of the identifier field
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Persisted fields in declaration order, identifier first
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field stamped when the entity is first persisted
    pub fn created_at_field(&self) -> Option<&str> {
        self.created_at_field.as_deref()
    }

    /// Field carrying the optimistic-lock version
    pub fn version_field(&self) -> Option<&str> {
        self.version_field.as_deref()
    }

    /// Fields whose values must be unique across rows
    pub fn unique_fields(&self) -> &[String] {
        &self.unique_fields
    }

    /// Declared relations
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    /// Look up a relation by name
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Whether `field` is a persisted field of this entity
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Fail with `InvalidSpecification` unless `field` is persisted
    pub fn require_field(&self, field: &str, operation: RepositoryOperation) -> RepositoryResult<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(RepositoryError::invalid_specification(
                operation,
                format!("unknown field `{field}` on {}", self.entity_name),
            ))
        }
    }
}

/// Builder for [`EntityDescriptor`]
///
/// Marker methods (`created_at`, `version`, `unique`, `relation`) also
/// register their field when it has not been declared yet.
#[derive(Debug, Clone)]
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// Declare a persisted field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.push_field(name.into());
        self
    }

    /// Declare several persisted fields
    #[must_use]
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.push_field(name.into());
        }
        self
    }

    /// Declare the creation-timestamp field
    #[must_use]
    pub fn created_at(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.push_field(name.clone());
        self.descriptor.created_at_field = Some(name);
        self
    }

    /// Declare the optimistic-lock version field
    #[must_use]
    pub fn version(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.push_field(name.clone());
        self.descriptor.version_field = Some(name);
        self
    }

    /// Declare a unique field
    #[must_use]
    pub fn unique(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.push_field(name.clone());
        if !self.descriptor.unique_fields.contains(&name) {
            self.descriptor.unique_fields.push(name);
        }
        self
    }

    /// Declare a to-one relation backed by `foreign_key`
    #[must_use]
    pub fn relation(
        mut self,
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let foreign_key = foreign_key.into();
        self.push_field(foreign_key.clone());
        self.descriptor.relations.push(RelationDescriptor {
            name: name.into(),
            foreign_key,
            target: target.into(),
        });
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }

    fn push_field(&mut self, name: String) {
        if !self.descriptor.fields.contains(&name) {
            self.descriptor.fields.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryErrorKind;

    #[test]
    fn test_id_field_is_first_and_unique() {
        let descriptor = EntityDescriptor::builder("Team", "id")
            .fields(["id", "name"])
            .build();
        assert_eq!(descriptor.fields(), ["id", "name"]);
        assert_eq!(descriptor.id_field(), "id");
    }

    #[test]
    fn test_markers_register_fields() {
        let descriptor = EntityDescriptor::builder("Item", "id")
            .created_at("created_date")
            .version("version")
            .unique("sku")
            .build();
        assert_eq!(
            descriptor.fields(),
            ["id", "created_date", "version", "sku"]
        );
        assert_eq!(descriptor.created_at_field(), Some("created_date"));
        assert_eq!(descriptor.version_field(), Some("version"));
        assert_eq!(descriptor.unique_fields(), ["sku"]);
    }

    #[test]
    fn test_relation_lookup() {
        let descriptor = EntityDescriptor::builder("Member", "id")
            .relation("team", "team_id", "Team")
            .build();
        let relation = descriptor.relation("team").unwrap();
        assert_eq!(relation.foreign_key, "team_id");
        assert!(descriptor.relation("orders").is_none());
    }

    #[test]
    fn test_require_field() {
        let descriptor = EntityDescriptor::builder("Team", "id").field("name").build();
        assert!(descriptor
            .require_field("name", RepositoryOperation::FindAll)
            .is_ok());
        let err = descriptor
            .require_field("label", RepositoryOperation::Count)
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidSpecification);
        assert_eq!(err.operation, RepositoryOperation::Count);
    }
}
