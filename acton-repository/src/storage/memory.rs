//! In-memory storage backed by an ordered map
//!
//! Rows live in a `BTreeMap` keyed by identifier behind a tokio `RwLock`, so
//! unordered queries return rows in identifier order. Lock hints are logged
//! and otherwise ignored: the map lock already serializes writers and no lock
//! outlives a call.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::Storage;
use crate::repository::{
    Entity, EntityId, FieldUpdate, OrderDirection, QuerySpecification, RepositoryError,
    RepositoryOperation, RepositoryResult, Sort, Value,
};

/// Reference [`Storage`] holding rows in memory
#[derive(Debug)]
pub struct InMemoryStorage<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> Default for InMemoryStorage<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryStorage<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn entity_name() -> &'static str {
        E::descriptor().entity_name()
    }

    fn require_id(entity: &E, operation: RepositoryOperation) -> RepositoryResult<E::Id> {
        entity
            .id()
            .cloned()
            .ok_or_else(|| RepositoryError::missing_identifier(operation, Self::entity_name()))
    }

    /// Reject `entity` if another row already holds one of its unique values
    fn check_unique(rows: &BTreeMap<E::Id, E>, id: &E::Id, entity: &E) -> RepositoryResult<()> {
        for field in E::descriptor().unique_fields() {
            let value = entity.get(field);
            if value.is_null() {
                continue;
            }
            let clash = rows.iter().any(|(other_id, other)| {
                other_id != id && other.get(field).compare(&value) == Some(Ordering::Equal)
            });
            if clash {
                tracing::warn!(
                    entity = Self::entity_name(),
                    field = field.as_str(),
                    "Rejected write violating unique field"
                );
                return Err(RepositoryError::constraint_violation(
                    RepositoryOperation::Save,
                    format!("duplicate value {value} for unique field `{field}`"),
                )
                .with_entity(Self::entity_name(), id.to_string()));
            }
        }
        Ok(())
    }

    /// Fill the creation timestamp and initial version when unset
    fn stamp_new(entity: &mut E) -> RepositoryResult<()> {
        let descriptor = E::descriptor();
        if let Some(field) = descriptor.created_at_field() {
            if entity.get(field).is_null() {
                entity.set(field, Value::Timestamp(Utc::now()))?;
            }
        }
        if let Some(field) = descriptor.version_field() {
            if entity.get(field).is_null() {
                entity.set(field, Value::Integer(0))?;
            }
        }
        Ok(())
    }

    fn matching<'a>(
        rows: &'a BTreeMap<E::Id, E>,
        spec: &'a QuerySpecification,
    ) -> impl Iterator<Item = (&'a E::Id, &'a E)> + 'a {
        rows.iter().filter(move |(_, entity)| spec.matches(*entity))
    }
}

fn compare_by<E: Entity>(sort: &Sort, left: &E, right: &E) -> Ordering {
    for order in sort.orders() {
        let ordering = left
            .get(&order.property)
            .sort_cmp(&right.get(&order.property));
        let ordering = match order.direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl<E: Entity> Storage<E> for InMemoryStorage<E> {
    async fn execute(&self, spec: &QuerySpecification) -> RepositoryResult<Vec<E>> {
        if let Some(lock) = spec.hints.lock {
            tracing::trace!(entity = Self::entity_name(), %lock, "Lock hint ignored by in-memory storage");
        }

        let rows = self.rows.read().await;
        let mut matched: Vec<E> = Self::matching(&rows, spec)
            .map(|(_, entity)| entity.clone())
            .collect();
        drop(rows);

        if spec.sort.is_sorted() {
            matched.sort_by(|a, b| compare_by(&spec.sort, a, b));
        }
        // Rows are unique by identifier, so `distinct` never removes one here
        if let Some(max) = spec.max_results {
            matched.truncate(to_usize(max));
        }
        if let Some(window) = spec.window {
            matched = matched
                .into_iter()
                .skip(to_usize(window.offset))
                .take(to_usize(window.limit))
                .collect();
        }

        tracing::trace!(
            entity = Self::entity_name(),
            %spec,
            rows = matched.len(),
            "Executed query"
        );
        Ok(matched)
    }

    async fn execute_count(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        let rows = self.rows.read().await;
        let count = Self::matching(&rows, spec).count() as u64;
        tracing::trace!(entity = Self::entity_name(), %spec, count, "Executed count");
        Ok(count)
    }

    async fn persist(&self, mut entity: E) -> RepositoryResult<E> {
        let id = Self::require_id(&entity, RepositoryOperation::Save)?;
        let mut rows = self.rows.write().await;

        if rows.contains_key(&id) {
            tracing::warn!(entity = Self::entity_name(), %id, "Rejected persist of existing identifier");
            return Err(RepositoryError::constraint_violation(
                RepositoryOperation::Save,
                "duplicate key",
            )
            .with_entity(Self::entity_name(), id.to_string()));
        }
        Self::check_unique(&rows, &id, &entity)?;
        Self::stamp_new(&mut entity)?;

        rows.insert(id.clone(), entity.clone());
        tracing::debug!(entity = Self::entity_name(), %id, "Persisted entity");
        Ok(entity)
    }

    async fn merge(&self, mut entity: E) -> RepositoryResult<E> {
        let id = Self::require_id(&entity, RepositoryOperation::Save)?;
        let descriptor = E::descriptor();
        let mut rows = self.rows.write().await;

        match rows.get(&id) {
            Some(stored) => {
                if let Some(field) = descriptor.version_field() {
                    let stored_version = stored.get(field);
                    let incoming = entity.get(field);
                    if incoming.compare(&stored_version) != Some(Ordering::Equal) {
                        tracing::warn!(entity = Self::entity_name(), %id, "Rejected merge of stale version");
                        return Err(RepositoryError::optimistic_lock_failure(
                            Self::entity_name(),
                            id.to_string(),
                            stored_version,
                            incoming,
                        ));
                    }
                    let next = stored_version.as_i64().unwrap_or_default().saturating_add(1);
                    entity.set(field, Value::Integer(next))?;
                }
                if let Some(field) = descriptor.created_at_field() {
                    entity.set(field, stored.get(field))?;
                }
            }
            None => Self::stamp_new(&mut entity)?,
        }
        Self::check_unique(&rows, &id, &entity)?;

        rows.insert(id.clone(), entity.clone());
        tracing::debug!(entity = Self::entity_name(), %id, "Merged entity");
        Ok(entity)
    }

    async fn remove_by_id(&self, id: &E::Id) -> RepositoryResult<bool> {
        let removed = self.rows.write().await.remove(id).is_some();
        tracing::debug!(entity = Self::entity_name(), %id, removed, "Removed entity");
        Ok(removed)
    }

    async fn execute_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> RepositoryResult<u64> {
        let mut rows = self.rows.write().await;

        // Stage every change first so a failing update leaves the table untouched
        let mut staged = Vec::new();
        for (id, entity) in Self::matching(&rows, spec) {
            let mut updated = entity.clone();
            for update in updates {
                update.apply(&mut updated)?;
            }
            staged.push((id.clone(), updated));
        }

        let affected = staged.len() as u64;
        rows.extend(staged);
        tracing::debug!(entity = Self::entity_name(), %spec, affected, "Executed bulk update");
        Ok(affected)
    }

    async fn execute_delete(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, entity| !spec.matches(entity));
        let removed = (before - rows.len()) as u64;
        tracing::debug!(entity = Self::entity_name(), %spec, removed, "Executed bulk delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{Item, Member};
    use crate::repository::{FilterCondition, Order, Pagination, RepositoryErrorKind};

    async fn seeded() -> InMemoryStorage<Member> {
        let storage = InMemoryStorage::new();
        for (id, username, age) in [(1, "AAA", 10), (2, "BBB", 20), (3, "CCC", 30)] {
            let mut member = Member::new(username, age);
            member.id = Some(id);
            storage.persist(member).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_execute_filters_sorts_and_windows() {
        let storage = seeded().await;
        let spec = QuerySpecification::new()
            .with_filter(FilterCondition::gte("age", 20_i64))
            .with_order(Order::desc("age"));
        let rows = storage.execute(&spec).await.unwrap();
        assert_eq!(
            rows.iter().map(|m| m.username.as_str()).collect::<Vec<_>>(),
            ["CCC", "BBB"]
        );

        let spec = QuerySpecification::new()
            .with_order(Order::asc("username"))
            .with_window(Pagination::new(1, 1));
        let rows = storage.execute(&spec).await.unwrap();
        assert_eq!(rows[0].username, "BBB");
    }

    #[tokio::test]
    async fn test_max_results_applies_before_window() {
        let storage = seeded().await;
        let spec = QuerySpecification::new()
            .with_max_results(2)
            .with_window(Pagination::new(1, 5));
        let rows = storage.execute(&spec).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "BBB");
    }

    #[tokio::test]
    async fn test_count_ignores_window() {
        let storage = seeded().await;
        let spec = QuerySpecification::new()
            .with_max_results(1)
            .with_window(Pagination::new(0, 1));
        assert_eq!(storage.execute_count(&spec).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persist_rejects_duplicates() {
        let storage = seeded().await;
        let mut duplicate = Member::new("ZZZ", 1);
        duplicate.id = Some(1);
        let err = storage.persist(duplicate).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);

        let mut clash = Member::new("AAA", 1);
        clash.id = Some(9);
        let err = storage.persist(clash).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert!(err.message.contains("username"));

        let err = storage.persist(Member::new("NEW", 1)).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MissingIdentifier);
        assert_eq!(storage.len().await, 3);
    }

    #[tokio::test]
    async fn test_persist_stamps_and_merge_checks_version() {
        let storage = InMemoryStorage::<Item>::new();
        let stored = storage.persist(Item::new("item-1", "widget")).await.unwrap();
        assert!(stored.created_date.is_some());
        assert_eq!(stored.version, Some(0));

        let mut renamed = stored.clone();
        renamed.name = "gadget".into();
        renamed.created_date = None;
        let merged = storage.merge(renamed).await.unwrap();
        assert_eq!(merged.version, Some(1));
        assert_eq!(merged.created_date, stored.created_date);

        let mut stale = stored.clone();
        stale.name = "stale".into();
        let err = storage.merge(stale).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::OptimisticLockFailure);
        assert_eq!(err.entity_id.as_deref(), Some("item-1"));
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let storage = seeded().await;
        let spec = QuerySpecification::new().with_filter(FilterCondition::gte("age", 20_i64));
        let affected = storage
            .execute_update(&spec, &[FieldUpdate::increment("age", 1)])
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let err = storage
            .execute_update(
                &QuerySpecification::new(),
                &[FieldUpdate::set("age", 1_i64), FieldUpdate::increment("username", 1)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidSpecification);
        let ages: Vec<i64> = storage
            .execute(&QuerySpecification::new())
            .await
            .unwrap()
            .iter()
            .map(|m| m.age)
            .collect();
        assert_eq!(ages, [10, 21, 31]);
    }

    #[tokio::test]
    async fn test_remove_and_delete() {
        let storage = seeded().await;
        assert!(storage.remove_by_id(&1).await.unwrap());
        assert!(!storage.remove_by_id(&1).await.unwrap());

        let spec = QuerySpecification::new().with_filter(FilterCondition::lt("age", 25_i64));
        assert_eq!(storage.execute_delete(&spec).await.unwrap(), 1);
        assert_eq!(storage.len().await, 1);
    }
}
