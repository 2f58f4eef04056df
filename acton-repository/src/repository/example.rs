//! Query by example
//!
//! A probe entity plus an [`ExampleMatcher`] describe "rows that look like
//! this one". Every populated, non-ignored field of the probe becomes an
//! equality predicate; null fields and the identifier are always skipped.

use super::entity::Entity;
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::FilterCondition;
use super::specification::QuerySpecification;
use super::traits::RepositoryResult;

/// Which probe fields take part in matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    ignored_paths: Vec<String>,
}

impl ExampleMatcher {
    /// Match on every populated field
    pub fn matching() -> Self {
        Self::default()
    }

    /// Leave `paths` out of the match
    #[must_use]
    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn ignored_paths(&self) -> &[String] {
        &self.ignored_paths
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|p| p == path)
    }
}

/// A probe entity and its matcher
///
/// # Example
///
/// ```rust,ignore
/// let probe = Member { id: None, username: "BBB".into(), age: 0, team_id: None };
/// let example = Example::of(probe, ExampleMatcher::matching().with_ignore_paths(["age"]));
/// let members = repository.find_by_example(&example).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Example<E> {
    probe: E,
    matcher: ExampleMatcher,
}

impl<E: Entity> Example<E> {
    pub fn of(probe: E, matcher: ExampleMatcher) -> Self {
        Self { probe, matcher }
    }

    /// Match on every populated field of `probe`
    pub fn new(probe: E) -> Self {
        Self::of(probe, ExampleMatcher::matching())
    }

    pub fn probe(&self) -> &E {
        &self.probe
    }

    pub fn matcher(&self) -> &ExampleMatcher {
        &self.matcher
    }

    /// Turn the probe into equality predicates
    ///
    /// Fails with `InvalidSpecification` if the matcher ignores a path that
    /// is not a field of `E`.
    pub fn to_specification(&self) -> RepositoryResult<QuerySpecification> {
        let descriptor = E::descriptor();
        for path in self.matcher.ignored_paths() {
            descriptor.require_field(path, RepositoryOperation::FindAll)?;
        }

        let predicates: Vec<FilterCondition> = descriptor
            .fields()
            .iter()
            .filter(|field| field.as_str() != descriptor.id_field())
            .filter(|field| !self.matcher.is_ignored(field))
            .filter_map(|field| {
                let value = self.probe.get(field);
                (!value.is_null()).then(|| FilterCondition::eq(field.clone(), value))
            })
            .collect();

        if let Some(list) = predicates.iter().find(|p| p.value.as_list().is_some()) {
            return Err(RepositoryError::invalid_specification(
                RepositoryOperation::FindAll,
                format!("probe field `{}` holds a list", list.field),
            ));
        }

        Ok(QuerySpecification::new().with_filters(predicates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryErrorKind;
    use crate::repository::fixtures::Member;
    use crate::repository::value::Value;

    #[test]
    fn test_populated_fields_become_predicates() {
        let probe = Member::new("BBB", 20);
        let spec = Example::new(probe).to_specification().unwrap();
        let fields: Vec<_> = spec.predicates.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(fields, ["username", "age"]);
    }

    #[test]
    fn test_ignored_paths_and_identifier_are_skipped() {
        let mut probe = Member::new("BBB", 0);
        probe.id = Some(7);
        let example = Example::of(probe, ExampleMatcher::matching().with_ignore_paths(["age"]));
        let spec = example.to_specification().unwrap();
        assert_eq!(spec.predicates, [FilterCondition::eq("username", Value::from("BBB"))]);
    }

    #[test]
    fn test_unknown_ignored_path_is_rejected() {
        let example = Example::of(
            Member::new("BBB", 0),
            ExampleMatcher::matching().with_ignore_paths(["nickname"]),
        );
        let err = example.to_specification().unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidSpecification);
    }
}
