//! Crate-level error type
//!
//! Repository operations return [`RepositoryResult`](crate::repository::RepositoryResult)
//! with a structured [`RepositoryError`]. Application code that also loads
//! configuration and initializes tracing can use [`Error`] and [`Result`],
//! which wrap all of these.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
