//! Entities and storage doubles shared by unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};

use chrono::{DateTime, Utc};

use super::{
    Entity, EntityDescriptor, FieldUpdate, LockMode, Projection, QuerySpecification,
    RepositoryError, RepositoryOperation, RepositoryResult, Value,
};
use crate::storage::{InMemoryStorage, Storage};

static MEMBER: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Member", "id")
        .fields(["username", "age"])
        .unique("username")
        .relation("team", "team_id", "Team")
        .build()
});

static TEAM: LazyLock<EntityDescriptor> =
    LazyLock::new(|| EntityDescriptor::builder("Team", "id").field("name").build());

static ITEM: LazyLock<EntityDescriptor> = LazyLock::new(|| {
    EntityDescriptor::builder("Item", "id")
        .field("name")
        .created_at("created_date")
        .version("version")
        .build()
});

fn wrong_type(entity: &str, field: &str, value: &Value) -> RepositoryError {
    RepositoryError::invalid_specification(
        RepositoryOperation::BulkUpdate,
        format!("cannot store {} in {entity}.{field}", value.type_name()),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub username: String,
    pub age: i64,
    pub team_id: Option<i64>,
}

impl Member {
    pub fn new(username: &str, age: i64) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            age,
            team_id: None,
        }
    }

    pub fn in_team(mut self, team_id: i64) -> Self {
        self.team_id = Some(team_id);
        self
    }
}

impl Entity for Member {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        &MEMBER
    }

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn get(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "username" => self.username.as_str().into(),
            "age" => self.age.into(),
            "team_id" => self.team_id.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> RepositoryResult<()> {
        match (field, &value) {
            ("username", Value::String(s)) => self.username = s.clone(),
            ("age", Value::Integer(n)) => self.age = *n,
            ("team_id", Value::Integer(n)) => self.team_id = Some(*n),
            ("team_id", Value::Null) => self.team_id = None,
            _ => return Err(wrong_type("Member", field, &value)),
        }
        Ok(())
    }
}

/// Typed projection reading only the username
#[derive(Debug, Clone, PartialEq)]
pub struct UsernameOnly {
    pub username: String,
}

impl Projection<Member> for UsernameOnly {
    const FIELDS: &'static [&'static str] = &["username"];

    fn project(member: &Member) -> Self {
        Self {
            username: member.username.clone(),
        }
    }
}

/// Projection naming a field `Member` does not map
#[derive(Debug)]
pub struct Nickname;

impl Projection<Member> for Nickname {
    const FIELDS: &'static [&'static str] = &["nickname"];

    fn project(_: &Member) -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

impl Entity for Team {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        &TEAM
    }

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn get(&self, field: &str) -> Value {
        match field {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> RepositoryResult<()> {
        match (field, &value) {
            ("name", Value::String(s)) => self.name = s.clone(),
            _ => return Err(wrong_type("Team", field, &value)),
        }
        Ok(())
    }
}

/// Entity with an externally assigned identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Option<String>,
    pub name: String,
    pub created_date: Option<DateTime<Utc>>,
    pub version: Option<i64>,
}

impl Item {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: name.to_string(),
            created_date: None,
            version: None,
        }
    }
}

impl Entity for Item {
    type Id = String;

    fn descriptor() -> &'static EntityDescriptor {
        &ITEM
    }

    fn id(&self) -> Option<&String> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn get(&self, field: &str) -> Value {
        match field {
            "id" => self.id.as_deref().into(),
            "name" => self.name.as_str().into(),
            "created_date" => self.created_date.into(),
            "version" => self.version.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> RepositoryResult<()> {
        match (field, &value) {
            ("name", Value::String(s)) => self.name = s.clone(),
            ("created_date", Value::Timestamp(ts)) => self.created_date = Some(*ts),
            ("created_date", Value::Null) => self.created_date = None,
            ("version", Value::Integer(n)) => self.version = Some(*n),
            _ => return Err(wrong_type("Item", field, &value)),
        }
        Ok(())
    }

    fn is_new(&self) -> bool {
        self.created_date.is_none()
    }
}

/// In-memory storage that counts calls and remembers the specifications it ran
#[derive(Debug)]
pub struct RecordingStorage<E: Entity> {
    inner: InMemoryStorage<E>,
    queries: AtomicUsize,
    counts: AtomicUsize,
    writes: AtomicUsize,
    executed: Mutex<Vec<QuerySpecification>>,
}

impl<E: Entity> Default for RecordingStorage<E> {
    fn default() -> Self {
        Self {
            inner: InMemoryStorage::new(),
            queries: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Entity> RecordingStorage<E> {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every storage call of any kind
    pub fn calls(&self) -> usize {
        self.queries() + self.counts() + self.writes()
    }

    pub fn last_lock(&self) -> Option<LockMode> {
        self.executed
            .lock()
            .unwrap()
            .last()
            .and_then(|spec| spec.hints.lock)
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::SeqCst);
        self.counts.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        self.executed.lock().unwrap().clear();
    }
}

impl<E: Entity> Storage<E> for RecordingStorage<E> {
    async fn execute(&self, spec: &QuerySpecification) -> RepositoryResult<Vec<E>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().unwrap().push(spec.clone());
        self.inner.execute(spec).await
    }

    async fn execute_count(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_count(spec).await
    }

    async fn persist(&self, entity: E) -> RepositoryResult<E> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(entity).await
    }

    async fn merge(&self, entity: E) -> RepositoryResult<E> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.merge(entity).await
    }

    async fn remove_by_id(&self, id: &E::Id) -> RepositoryResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_by_id(id).await
    }

    async fn execute_update(
        &self,
        spec: &QuerySpecification,
        updates: &[FieldUpdate],
    ) -> RepositoryResult<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_update(spec, updates).await
    }

    async fn execute_delete(&self, spec: &QuerySpecification) -> RepositoryResult<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_delete(spec).await
    }
}
