//! Generic repository over any storage collaborator
//!
//! [`GenericRepository`] implements [`Repository`] for one entity type on top
//! of a [`Storage`]. Every specification, page request, projection and
//! derived query is validated against the entity descriptor before the first
//! storage call, so a bad request never reaches storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_repository::prelude::*;
//!
//! let members = GenericRepository::<Member, _>::new(InMemoryStorage::new(), SequenceGenerator::default());
//!
//! members.save(Member::new("AAA", 10)).await?;
//! members.save(Member::new("BBB", 20)).await?;
//!
//! let found = members
//!     .find_derived("findByUsernameAndAgeGreaterThan", vec!["BBB".into(), 15_i64.into()])
//!     .await?;
//! assert_eq!(found.len(), 1);
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::entity::{Entity, EntityId, IdGenerator};
use super::error::{RepositoryError, RepositoryOperation};
use super::example::Example;
use super::filter::FilterCondition;
use super::page::{Page, PageParams, PageRequest, Pagination, Slice};
use super::projection::{ProjectedRow, Projection, ProjectionSpec};
use super::resolver::{DerivedQuery, QueryAction};
use super::specification::{FieldUpdate, LockMode, QuerySpecification};
use super::traits::{RelationLoader, Repository, RepositoryResult};
use super::value::Value;
use crate::config::PagingConfig;
use crate::storage::Storage;

/// Repository for entity type `E` backed by storage `S`
pub struct GenericRepository<E: Entity, S> {
    storage: S,
    ids: Arc<dyn IdGenerator<E::Id>>,
    paging: PagingConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Storage<E>> GenericRepository<E, S> {
    /// Create a repository that assigns missing identifiers from `ids`
    pub fn new(storage: S, ids: impl IdGenerator<E::Id> + 'static) -> Self {
        Self {
            storage,
            ids: Arc::new(ids),
            paging: PagingConfig::default(),
            _entity: PhantomData,
        }
    }

    /// Use `paging` for requests built from external parameters
    #[must_use]
    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    fn entity_name() -> &'static str {
        E::descriptor().entity_name()
    }

    /// Build a page request from external parameters using this repository's paging defaults
    pub fn page_request(&self, params: &PageParams) -> RepositoryResult<PageRequest> {
        PageRequest::from_params(params, &self.paging)
    }

    /// Find at most one entity matching `spec`
    ///
    /// Fails with `NonUniqueResult` when more than one row matches. A row cap
    /// of 1 on `spec` (`findFirst...`) selects the first match instead.
    pub async fn find_one(&self, spec: &QuerySpecification) -> RepositoryResult<Option<E>> {
        spec.validate(E::descriptor(), RepositoryOperation::FindAll)?;
        let cap = spec.max_results.map_or(2, |max| max.min(2));
        let limited = spec.clone().with_max_results(cap);
        let mut rows = self.storage.execute(&limited).await?;
        if rows.len() > 1 {
            return Err(RepositoryError::non_unique_result(
                Self::entity_name(),
                rows.len(),
            ));
        }
        Ok(rows.pop())
    }

    /// Count entities matching `spec`
    pub async fn count_matching(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        spec.validate(E::descriptor(), RepositoryOperation::Count)?;
        self.storage.execute_count(spec).await
    }

    /// Delete every entity matching `spec`, returning the number removed
    pub async fn delete_all(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        spec.validate(E::descriptor(), RepositoryOperation::Delete)?;
        let removed = self.storage.execute_delete(spec).await?;
        tracing::debug!(entity = Self::entity_name(), removed, "Deleted matching entities");
        Ok(removed)
    }

    /// Find entities that look like the example's probe
    pub async fn find_by_example(&self, example: &Example<E>) -> RepositoryResult<Vec<E>> {
        let spec = example.to_specification()?;
        self.find_all(&spec).await
    }

    /// Find one page of entities that look like the example's probe
    pub async fn find_page_by_example(
        &self,
        example: &Example<E>,
        request: &PageRequest,
    ) -> RepositoryResult<Page<E>> {
        let spec = example.to_specification()?;
        self.find_page(&spec, request).await
    }

    /// Find entities matching `spec` and convert each to the projection `P`
    pub async fn find_projected<P: Projection<E>>(
        &self,
        spec: &QuerySpecification,
    ) -> RepositoryResult<Vec<P>> {
        P::validate(RepositoryOperation::FindAll)?;
        let rows = self.find_all(spec).await?;
        Ok(rows.iter().map(P::project).collect())
    }

    /// Find one page and convert its content to the projection `P`
    pub async fn find_page_projected<P: Projection<E>>(
        &self,
        spec: &QuerySpecification,
        request: &PageRequest,
    ) -> RepositoryResult<Page<P>> {
        P::validate(RepositoryOperation::FindPage)?;
        let page = self.find_page(spec, request).await?;
        Ok(page.map(|entity| P::project(&entity)))
    }

    /// Find entities matching `spec`, reading only the fields of `projection`
    pub async fn find_fields(
        &self,
        spec: &QuerySpecification,
        projection: &ProjectionSpec,
    ) -> RepositoryResult<Vec<ProjectedRow>> {
        projection.validate(E::descriptor(), RepositoryOperation::FindAll)?;
        let rows = self.find_all(spec).await?;
        Ok(rows.iter().map(|entity| projection.apply(entity)).collect())
    }

    /// Find entities matching `spec` with a pessimistic lock intent
    ///
    /// The lock is forwarded to storage as a hint; its lifetime belongs to the
    /// caller's transaction.
    pub async fn find_with_lock(
        &self,
        spec: &QuerySpecification,
        lock: LockMode,
    ) -> RepositoryResult<Vec<E>> {
        let locked = spec.clone().with_lock(lock);
        self.find_all(&locked).await
    }

    /// Find entities matching `spec` together with the target of `relation`
    ///
    /// Related entities are fetched with a single batch load over the distinct
    /// foreign keys of the result; rows without a foreign key, or whose target
    /// is missing, are paired with `None`.
    pub async fn find_with_related<R, L>(
        &self,
        spec: &QuerySpecification,
        relation: &str,
        loader: &L,
    ) -> RepositoryResult<Vec<(E, Option<R>)>>
    where
        R: Entity,
        L: RelationLoader<R>,
    {
        let descriptor = E::descriptor();
        let target = R::descriptor().entity_name();
        let foreign_key = match descriptor.relation(relation) {
            Some(r) if r.target == target => r.foreign_key.as_str(),
            Some(r) => {
                return Err(RepositoryError::invalid_specification(
                    RepositoryOperation::BatchLoad,
                    format!(
                        "relation `{relation}` on {} targets {}, not {target}",
                        descriptor.entity_name(),
                        r.target
                    ),
                ))
            }
            None => {
                return Err(RepositoryError::invalid_specification(
                    RepositoryOperation::BatchLoad,
                    format!("unknown relation `{relation}` on {}", descriptor.entity_name()),
                ))
            }
        };

        let roots = self.find_all(&spec.clone().with_fetch(relation)).await?;

        let mut keys: Vec<R::Id> = roots
            .iter()
            .filter_map(|root| R::Id::from_value(&root.get(foreign_key)))
            .collect();
        keys.sort();
        keys.dedup();

        let related = loader.batch_load(&keys).await?;
        tracing::debug!(
            entity = descriptor.entity_name(),
            relation,
            roots = roots.len(),
            related = related.len(),
            "Loaded related entities"
        );

        Ok(roots
            .into_iter()
            .map(|root| {
                let target = R::Id::from_value(&root.get(foreign_key))
                    .and_then(|key| related.get(&key).cloned());
                (root, target)
            })
            .collect())
    }

    /// Parse `method_name`, check it performs `expected`, and bind `args`
    fn resolve(
        method_name: &str,
        args: Vec<Value>,
        expected: QueryAction,
    ) -> RepositoryResult<QuerySpecification> {
        let query = DerivedQuery::parse(method_name, E::descriptor())?;
        if query.action() != expected {
            return Err(RepositoryError::malformed_query_name(
                method_name,
                format!("is a {} query, not a {expected} query", query.action()),
            ));
        }
        let spec = query.bind(args)?;
        spec.validate(E::descriptor(), RepositoryOperation::ResolveQuery)?;
        Ok(spec)
    }

    /// Run a derived `find...By...` query
    pub async fn find_derived(&self, method_name: &str, args: Vec<Value>) -> RepositoryResult<Vec<E>> {
        let spec = Self::resolve(method_name, args, QueryAction::Find)?;
        self.find_all(&spec).await
    }

    /// Run a derived `find...By...` query expected to match at most one row
    pub async fn find_one_derived(
        &self,
        method_name: &str,
        args: Vec<Value>,
    ) -> RepositoryResult<Option<E>> {
        let spec = Self::resolve(method_name, args, QueryAction::Find)?;
        self.find_one(&spec).await
    }

    /// Run a derived `find...By...` query one page at a time
    pub async fn find_page_derived(
        &self,
        method_name: &str,
        args: Vec<Value>,
        request: &PageRequest,
    ) -> RepositoryResult<Page<E>> {
        let spec = Self::resolve(method_name, args, QueryAction::Find)?;
        self.find_page(&spec, request).await
    }

    /// Run a derived `find...By...` query as a count-free slice
    pub async fn find_slice_derived(
        &self,
        method_name: &str,
        args: Vec<Value>,
        request: &PageRequest,
    ) -> RepositoryResult<Slice<E>> {
        let spec = Self::resolve(method_name, args, QueryAction::Find)?;
        self.find_slice(&spec, request).await
    }

    /// Run a derived `count...By...` query
    pub async fn count_derived(&self, method_name: &str, args: Vec<Value>) -> RepositoryResult<u64> {
        let spec = Self::resolve(method_name, args, QueryAction::Count)?;
        self.storage.execute_count(&spec).await
    }

    /// Run a derived `exists...By...` query
    pub async fn exists_derived(&self, method_name: &str, args: Vec<Value>) -> RepositoryResult<bool> {
        let spec = Self::resolve(method_name, args, QueryAction::Exists)?;
        Ok(!self.storage.execute(&spec).await?.is_empty())
    }

    /// Run a derived `delete...By...` query, returning the number removed
    pub async fn delete_derived(&self, method_name: &str, args: Vec<Value>) -> RepositoryResult<u64> {
        let spec = Self::resolve(method_name, args, QueryAction::Delete)?;
        self.storage.execute_delete(&spec).await
    }
}

impl<E: Entity, S: Storage<E>> Repository<E> for GenericRepository<E, S> {
    async fn save(&self, mut entity: E) -> RepositoryResult<E> {
        let is_new = entity.is_new();
        if entity.id().is_none() {
            let id = self.ids.next_id().ok_or_else(|| {
                RepositoryError::missing_identifier(RepositoryOperation::Save, Self::entity_name())
            })?;
            entity.set_id(id);
        }

        let saved = if is_new {
            self.storage.persist(entity).await?
        } else {
            self.storage.merge(entity).await?
        };
        tracing::debug!(
            entity = Self::entity_name(),
            id = ?saved.id(),
            persisted = is_new,
            "Saved entity"
        );
        Ok(saved)
    }

    async fn find_by_id(&self, id: &E::Id) -> RepositoryResult<Option<E>> {
        let spec = QuerySpecification::by_id::<E>(id).with_max_results(1);
        let mut rows = self.storage.execute(&spec).await?;
        Ok(rows.pop())
    }

    async fn find_all(&self, spec: &QuerySpecification) -> RepositoryResult<Vec<E>> {
        spec.validate(E::descriptor(), RepositoryOperation::FindAll)?;
        self.storage.execute(spec).await
    }

    async fn find_page(
        &self,
        spec: &QuerySpecification,
        request: &PageRequest,
    ) -> RepositoryResult<Page<E>> {
        let sort = spec.sort.clone().and(request.sort().clone());
        let windowed = spec
            .clone()
            .with_sort(sort.clone())
            .with_window(request.pagination());
        windowed.validate(E::descriptor(), RepositoryOperation::FindPage)?;

        let content = self.storage.execute(&windowed).await?;

        // A short page needs no count: everything up to it is accounted for
        let offset = request.offset();
        let len = content.len() as u64;
        let total = if len < request.page_size() && (offset == 0 || len > 0) {
            offset + len
        } else {
            let count = self.storage.execute_count(spec).await?;
            spec.max_results.map_or(count, |max| count.min(max))
        };

        tracing::debug!(
            entity = Self::entity_name(),
            page = request.page_number(),
            size = request.page_size(),
            total,
            "Fetched page"
        );
        Ok(Page::of(content, request.page_number(), request.page_size(), total)?.with_sort(sort))
    }

    async fn find_slice(
        &self,
        spec: &QuerySpecification,
        request: &PageRequest,
    ) -> RepositoryResult<Slice<E>> {
        let sort = spec.sort.clone().and(request.sort().clone());
        let windowed = spec
            .clone()
            .with_sort(sort.clone())
            .with_window(Pagination::new(
                request.offset(),
                request.page_size().saturating_add(1),
            ));
        windowed.validate(E::descriptor(), RepositoryOperation::FindSlice)?;

        let mut content = self.storage.execute(&windowed).await?;
        let has_next = content.len() as u64 > request.page_size();
        content.truncate(usize::try_from(request.page_size()).unwrap_or(usize::MAX));

        Ok(Slice::new(content, request.page_number(), request.page_size(), has_next)?.with_sort(sort))
    }

    async fn count(&self) -> RepositoryResult<u64> {
        self.storage.execute_count(&QuerySpecification::new()).await
    }

    async fn exists(&self, id: &E::Id) -> RepositoryResult<bool> {
        let count = self
            .storage
            .execute_count(&QuerySpecification::by_id::<E>(id))
            .await?;
        Ok(count > 0)
    }

    async fn delete(&self, entity: &E) -> RepositoryResult<bool> {
        let id = entity.id().ok_or_else(|| {
            RepositoryError::missing_identifier(RepositoryOperation::Delete, Self::entity_name())
        })?;
        self.delete_by_id(id).await
    }

    async fn delete_by_id(&self, id: &E::Id) -> RepositoryResult<bool> {
        let removed = self.storage.remove_by_id(id).await?;
        tracing::debug!(entity = Self::entity_name(), %id, removed, "Deleted entity");
        Ok(removed)
    }

    async fn bulk_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> RepositoryResult<u64> {
        spec.validate(E::descriptor(), RepositoryOperation::BulkUpdate)?;
        if updates.is_empty() {
            return Err(RepositoryError::invalid_specification(
                RepositoryOperation::BulkUpdate,
                "no field updates given",
            ));
        }
        for update in updates {
            update.validate(E::descriptor())?;
        }

        let affected = self.storage.execute_update(spec, updates).await?;
        tracing::debug!(entity = Self::entity_name(), %spec, affected, "Bulk updated entities");
        Ok(affected)
    }
}

impl<R: Entity, S: Storage<R>> RelationLoader<R> for GenericRepository<R, S> {
    async fn batch_load(&self, ids: &[R::Id]) -> RepositoryResult<HashMap<R::Id, R>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let spec = QuerySpecification::new().with_filter(FilterCondition::in_list(
            R::descriptor().id_field(),
            ids.iter().map(|id| id.to_value()),
        ));
        let rows = self
            .storage
            .execute(&spec)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::BatchLoad))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.id().cloned().map(|id| (id, row)))
            .collect())
    }
}
