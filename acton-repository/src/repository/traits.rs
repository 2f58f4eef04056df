//! Repository trait definitions
//!
//! This module provides the generic repository contract using RPITIT
//! (Return Position Impl Trait In Traits), available since Rust 1.75.
//!
//! # Overview
//!
//! - [`Repository`]: save/find/page/slice/count/delete/bulk-update over one entity type
//! - [`RelationLoader`]: batch loading of related entities by identifier (N+1 prevention)
//!
//! [`GenericRepository`](super::GenericRepository) implements both on top of
//! any [`Storage`](crate::storage::Storage).

use std::collections::HashMap;
use std::future::Future;

use super::entity::Entity;
use super::error::RepositoryError;
use super::page::{Page, PageRequest, Slice};
use super::specification::{FieldUpdate, QuerySpecification};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Base repository contract for one entity type
///
/// # Example
///
/// ```rust,ignore
/// use acton_repository::repository::{PageRequest, QuerySpecification, Repository};
///
/// let saved = members.save(Member::new("AAA", 10)).await?;
/// let found = members.find_by_id(saved.id.as_ref().unwrap()).await?;
/// assert_eq!(found, Some(saved));
///
/// let page = members
///     .find_page(&QuerySpecification::new(), &PageRequest::of(0, 20)?)
///     .await?;
/// ```
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert a new entity or merge an existing one
    ///
    /// An identifier is generated when absent. The entity's
    /// [`is_new`](Entity::is_new) decides between insert and merge; no
    /// existence check is issued.
    fn save(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Find an entity by its identifier
    ///
    /// Returns `Ok(None)` if the entity does not exist.
    fn find_by_id(&self, id: &E::Id) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Find all entities matching `spec`, honoring its ordering and window
    fn find_all(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Find one page of matches together with the total count
    ///
    /// The request's sort is applied after the specification's own ordering.
    fn find_page(
        &self,
        spec: &QuerySpecification,
        request: &PageRequest,
    ) -> impl Future<Output = RepositoryResult<Page<E>>> + Send;

    /// Find one page of matches without counting
    fn find_slice(
        &self,
        spec: &QuerySpecification,
        request: &PageRequest,
    ) -> impl Future<Output = RepositoryResult<Slice<E>>> + Send;

    /// Count all entities
    fn count(&self) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Check if an entity with the given identifier exists
    fn exists(&self, id: &E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Delete an entity; returns `false` if it was not stored
    fn delete(&self, entity: &E) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Delete by identifier; returns `false` if it was not stored
    fn delete_by_id(&self, id: &E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Apply `updates` to every row matching `spec` and return the number of rows changed
    ///
    /// The update goes straight to storage. Entities loaded before the call
    /// keep their old values; reload them if they are still needed.
    fn bulk_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;
}

/// Loads related entities of type `R` in batches
///
/// # Example
///
/// ```rust,ignore
/// let team_ids = members.iter().filter_map(|m| m.team_id).collect::<Vec<_>>();
/// let teams = team_repository.batch_load(&team_ids).await?;
/// ```
pub trait RelationLoader<R: Entity>: Send + Sync {
    /// Load every entity whose identifier is in `ids`, with one storage query
    ///
    /// Missing identifiers are absent from the returned map.
    fn batch_load(
        &self,
        ids: &[R::Id],
    ) -> impl Future<Output = RepositoryResult<HashMap<R::Id, R>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::{RepositoryErrorKind, RepositoryOperation};
    use crate::repository::fixtures::Team;

    #[test]
    fn test_repository_result_type() {
        let ok: RepositoryResult<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: RepositoryResult<i32> = Err(RepositoryError::not_found("Team", "1"));
        assert_eq!(err.unwrap_err().kind, RepositoryErrorKind::NotFound);
    }

    // A loader that never touches storage still satisfies the contract
    struct EmptyLoader;

    impl RelationLoader<Team> for EmptyLoader {
        async fn batch_load(&self, ids: &[i64]) -> RepositoryResult<HashMap<i64, Team>> {
            if ids.iter().any(|id| *id < 0) {
                return Err(RepositoryError::invalid_specification(
                    RepositoryOperation::BatchLoad,
                    "negative id",
                ));
            }
            Ok(HashMap::new())
        }
    }

    #[tokio::test]
    async fn test_relation_loader_can_be_implemented() {
        let loader = EmptyLoader;
        assert!(loader.batch_load(&[1, 2]).await.unwrap().is_empty());
        assert!(loader.batch_load(&[-1]).await.is_err());
    }
}
