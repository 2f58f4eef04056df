//! Repository error types
//!
//! Every failure raised by the repository layer carries the operation that was
//! running, a [`RepositoryErrorKind`] category, a message, and (when known) the
//! entity type and identifier involved.
//!
//! Absence is not an error: `find_by_id` returns `Ok(None)` for a missing row.
//! [`RepositoryErrorKind::NotFound`] exists for callers that want to turn that
//! absence into a failure of their own.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::malformed_query_name("findByNickname", "unknown property `nickname`");
//! assert_eq!(error.kind, RepositoryErrorKind::MalformedQueryName);
//! assert!(error.is_validation_error());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Saving an entity (persist or merge)
    Save,
    /// Finding a single entity by ID
    FindById,
    /// Finding entities matching a specification
    FindAll,
    /// Finding a page of entities (with total count)
    FindPage,
    /// Finding a slice of entities (no total count)
    FindSlice,
    /// Counting entities matching a specification
    Count,
    /// Checking if an entity exists
    Exists,
    /// Deleting entities
    Delete,
    /// Updating many rows in place
    BulkUpdate,
    /// Turning a method name into a query specification
    ResolveQuery,
    /// Batch loading related entities
    BatchLoad,
    /// Building a page or page request
    Paginate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::FindPage => write!(f, "find_page"),
            Self::FindSlice => write!(f, "find_slice"),
            Self::Count => write!(f, "count"),
            Self::Exists => write!(f, "exists"),
            Self::Delete => write!(f, "delete"),
            Self::BulkUpdate => write!(f, "bulk_update"),
            Self::ResolveQuery => write!(f, "resolve_query"),
            Self::BatchLoad => write!(f, "batch_load"),
            Self::Paginate => write!(f, "paginate"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// A derived query method name could not be parsed
    MalformedQueryName,
    /// Page number, page size or page content are out of range
    InvalidPageParameters,
    /// A specification references an unknown field or carries an ill-typed operand
    InvalidSpecification,
    /// Positional arguments do not fit the derived query
    ArgumentMismatch,
    /// A single-result query matched more than one row
    NonUniqueResult,
    /// An entity has no identifier and none could be generated
    MissingIdentifier,
    /// Storage rejected a write (duplicate key, unique field)
    ConstraintViolation,
    /// The stored version differs from the version being merged
    OptimisticLockFailure,
    /// Underlying storage failure
    StorageFailure,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::MalformedQueryName => write!(f, "malformed_query_name"),
            Self::InvalidPageParameters => write!(f, "invalid_page_parameters"),
            Self::InvalidSpecification => write!(f, "invalid_specification"),
            Self::ArgumentMismatch => write!(f, "argument_mismatch"),
            Self::NonUniqueResult => write!(f, "non_unique_result"),
            Self::MissingIdentifier => write!(f, "missing_identifier"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::OptimisticLockFailure => write!(f, "optimistic_lock_failure"),
            Self::StorageFailure => write!(f, "storage_failure"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use acton_repository::repository::{RepositoryError, RepositoryOperation, RepositoryErrorKind};
///
/// let error = RepositoryError::constraint_violation(RepositoryOperation::Save, "duplicate key")
///     .with_entity("Member", "7");
/// assert_eq!(error.kind, RepositoryErrorKind::ConstraintViolation);
/// assert!(error.to_string().contains("[Member: 7]"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Member", "Team")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an error for a derived query name that cannot be parsed
    ///
    /// The offending method name is kept in the message so the caller can
    /// locate the declaration.
    pub fn malformed_query_name(method_name: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            RepositoryOperation::ResolveQuery,
            RepositoryErrorKind::MalformedQueryName,
            format!("`{method_name}`: {reason}"),
        )
    }

    /// Create an invalid page parameters error
    pub fn invalid_page_parameters(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Paginate,
            RepositoryErrorKind::InvalidPageParameters,
            message,
        )
    }

    /// Create an invalid specification error
    pub fn invalid_specification(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidSpecification, message)
    }

    /// Create an argument mismatch error for a derived query
    pub fn argument_mismatch(method_name: &str, message: impl fmt::Display) -> Self {
        Self::new(
            RepositoryOperation::ResolveQuery,
            RepositoryErrorKind::ArgumentMismatch,
            format!("`{method_name}`: {message}"),
        )
    }

    /// Create a non-unique result error
    pub fn non_unique_result(entity_type: impl Into<String>, found: usize) -> Self {
        Self {
            operation: RepositoryOperation::FindAll,
            kind: RepositoryErrorKind::NonUniqueResult,
            message: format!("Expected at most one result, found {found}"),
            entity_type: Some(entity_type.into()),
            entity_id: None,
        }
    }

    /// Create a missing identifier error
    pub fn missing_identifier(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind: RepositoryErrorKind::MissingIdentifier,
            message: "Entity has no identifier and none could be generated".to_string(),
            entity_type: Some(entity_type.into()),
            entity_id: None,
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Create an optimistic lock failure for a stale version
    pub fn optimistic_lock_failure(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::OptimisticLockFailure,
            format!("Stale version {found}, stored version is {expected}"),
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a storage failure error
    pub fn storage_failure(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StorageFailure, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error was raised while validating input, before storage was touched
    ///
    /// ```rust
    /// use acton_repository::repository::{RepositoryError, RepositoryOperation};
    ///
    /// assert!(RepositoryError::invalid_page_parameters("size must be positive").is_validation_error());
    /// assert!(!RepositoryError::storage_failure(RepositoryOperation::FindAll, "io").is_validation_error());
    /// ```
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::MalformedQueryName
                | RepositoryErrorKind::InvalidPageParameters
                | RepositoryErrorKind::InvalidSpecification
                | RepositoryErrorKind::ArgumentMismatch
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{entity_type}: {entity_id}]"),
            (Some(entity_type), None) => write!(f, " [{entity_type}]"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for RepositoryError {}
