//! Storage collaborator contract
//!
//! The repository layer never talks to a database directly. It hands
//! validated [`QuerySpecification`]s and entities to a [`Storage`]
//! implementation, which owns execution, transactions and lock lifetime.
//! Errors returned by storage reach the caller unchanged.
//!
//! [`InMemoryStorage`] is a reference implementation backed by an ordered map.

mod memory;

use std::future::Future;
use std::sync::Arc;

use crate::repository::{Entity, FieldUpdate, QuerySpecification, RepositoryResult};

pub use memory::InMemoryStorage;

/// Executes specifications and writes for entity type `E`
pub trait Storage<E: Entity>: Send + Sync {
    /// Rows matching the predicates, ordered, capped by `max_results`, then windowed
    fn execute(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Number of rows matching the predicates; ordering, window and row cap are ignored
    fn execute_count(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Insert a new row
    fn persist(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Write the state of an existing row (inserting it if absent)
    fn merge(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Remove a row; `false` if no row had this identifier
    fn remove_by_id(&self, id: &E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Apply `updates` to every row matching the predicates, returning the number changed
    fn execute_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Remove every row matching the predicates, returning the number removed
    fn execute_delete(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;
}

impl<E: Entity, S: Storage<E>> Storage<E> for Arc<S> {
    fn execute(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send {
        S::execute(self, spec)
    }

    fn execute_count(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send {
        S::execute_count(self, spec)
    }

    fn persist(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send {
        S::persist(self, entity)
    }

    fn merge(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send {
        S::merge(self, entity)
    }

    fn remove_by_id(&self, id: &E::Id) -> impl Future<Output = RepositoryResult<bool>> + Send {
        S::remove_by_id(self, id)
    }

    fn execute_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send {
        S::execute_update(self, spec, updates)
    }

    fn execute_delete(
        &self,
        spec: &QuerySpecification,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send {
        S::execute_delete(self, spec)
    }
}
