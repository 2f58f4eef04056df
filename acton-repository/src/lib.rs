//! # acton-repository
//!
//! Generic data-access layer: one repository implementation per entity type,
//! queries derived from method names, paging with and without totals,
//! projections, query by example and batch relation loading.
//!
//! ## Features
//!
//! - **Generic repository**: save/find/page/slice/count/delete/bulk update over any entity
//! - **Derived queries**: `findByUsernameAndAgeGreaterThan` style names resolved against entity metadata
//! - **Validation first**: malformed names, unknown fields and bad page parameters never reach storage
//! - **Pluggable storage**: the [`Storage`](storage::Storage) trait, with an in-memory reference implementation
//! - **Configuration**: paging defaults layered from defaults, `config.toml` and `ACTON_REPOSITORY_*` variables
//! - **Observability**: structured JSON logging through `tracing`
//!
//! ## Example
//!
//! ```rust,no_run
//! use acton_repository::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Turn external page parameters into a validated request
//!     let params = PageParams {
//!         page: Some(2),
//!         size: Some(500),
//!         sort: vec!["username,desc".to_string()],
//!     };
//!     let request = PageRequest::from_params(&params, &config.paging)?;
//!     assert_eq!(request.page_size(), config.paging.max_page_size);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod repository;
pub mod storage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, PagingConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::observability::{init_tracing, shutdown_tracing};

    pub use crate::repository::{
        AssignedIdentifiers, DerivedQuery, Entity, EntityDescriptor, EntityId, Example,
        ExampleMatcher, FieldUpdate, FilterCondition, FilterOperator, GenericRepository,
        IdGenerator, LockMode, Order, OrderDirection, Page, PageParams, PageRequest, Projection,
        ProjectionSpec, QueryAction, QuerySpecification, RelationLoader, Repository,
        RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
        SequenceGenerator, Slice, Sort, UuidV7Generator, Value,
    };
    pub use crate::storage::{InMemoryStorage, Storage};
}
