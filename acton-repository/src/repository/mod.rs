//! Generic repositories and derived queries
//!
//! This module provides the repository contract, the query model it speaks,
//! and a generic implementation that works over any
//! [`Storage`](crate::storage::Storage) collaborator.
//!
//! # Features
//!
//! - **Generic repository**: [`Repository`] for save, find, page, slice, count, delete and bulk update
//! - **Derived queries**: [`DerivedQuery`] turns names like `findTop3ByAgeGreaterThanOrderByAgeDesc` into a [`QuerySpecification`]
//! - **Paging**: [`PageRequest`], [`Page`] with totals, and count-free [`Slice`]
//! - **Projections**: typed [`Projection`]s and runtime [`ProjectionSpec`]s
//! - **Query by example**: [`Example`] with an [`ExampleMatcher`]
//! - **Relation loading**: [`RelationLoader`] for batch loading (N+1 prevention)
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_repository::repository::{
//!     Entity, EntityDescriptor, GenericRepository, PageRequest, QuerySpecification, Repository,
//!     RepositoryResult, SequenceGenerator, Value,
//! };
//! use acton_repository::storage::InMemoryStorage;
//!
//! static MEMBER: LazyLock<EntityDescriptor> = LazyLock::new(|| {
//!     EntityDescriptor::builder("Member", "id").fields(["username", "age"]).build()
//! });
//!
//! impl Entity for Member {
//!     type Id = i64;
//!
//!     fn descriptor() -> &'static EntityDescriptor {
//!         &MEMBER
//!     }
//!
//!     // id, set_id, get and set map the fields above
//! }
//!
//! let members = GenericRepository::<Member, _>::new(InMemoryStorage::new(), SequenceGenerator::default());
//! members.save(Member::new("AAA", 10)).await?;
//!
//! let page = members
//!     .find_page_derived(
//!         "findByAgeGreaterThanOrderByUsernameAsc",
//!         vec![Value::from(5_i64)],
//!         &PageRequest::of(0, 20)?,
//!     )
//!     .await?;
//! ```

mod descriptor;
mod entity;
mod error;
mod example;
mod filter;
mod generic;
mod page;
mod projection;
mod resolver;
mod specification;
mod traits;
mod value;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export all public types
pub use descriptor::{EntityDescriptor, EntityDescriptorBuilder, RelationDescriptor};
pub use entity::{AssignedIdentifiers, Entity, EntityId, IdGenerator, SequenceGenerator, UuidV7Generator};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use example::{Example, ExampleMatcher};
pub use filter::{FilterCondition, FilterOperator};
pub use generic::GenericRepository;
pub use page::{Order, OrderDirection, Page, PageParams, PageRequest, Pagination, Slice, Sort};
pub use projection::{ProjectedRow, Projection, ProjectionSpec};
pub use resolver::{DerivedPredicate, DerivedQuery, QueryAction};
pub use specification::{FieldUpdate, LockMode, QueryHints, QuerySpecification};
pub use traits::{RelationLoader, Repository, RepositoryResult};
pub use value::Value;
