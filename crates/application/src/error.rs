//! Application error types

use thiserror::Error;
use stencil_domain::{DomainError, SerializedError};

use crate::ports::{DataSourceError, LocationError};
use crate::query_runner::RunnerError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A data source call failed.
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// No query runner fits the data source.
    #[error("query runner error: {0}")]
    Runner(#[from] RunnerError),

    /// Writing the URL failed.
    #[error("location error: {0}")]
    Location(#[from] LocationError),

    /// No variable with that id is registered.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// A variable with that id already exists.
    #[error("variable already exists: {0}")]
    DuplicateVariable(String),

    /// The operation does not apply to this variable kind.
    #[error("unsupported operation for {kind} variable: {operation}")]
    Unsupported {
        /// Variable kind.
        kind: &'static str,
        /// Operation name.
        operation: &'static str,
    },

    /// The session was torn down or a newer transaction replaced this one.
    #[error("operation cancelled")]
    Cancelled,
}

impl ApplicationError {
    /// Reduces the error to plain data for storage in state.
    #[must_use]
    pub fn to_serialized(&self) -> SerializedError {
        let serialized = SerializedError::new(self.to_string());
        match self {
            Self::DataSource(DataSourceError::Query { code: Some(code), .. }) => {
                serialized.with_code(code.clone())
            }
            Self::Runner(_) => serialized.with_code("runner"),
            Self::VariableNotFound(_) => serialized.with_code("not_found"),
            _ => serialized,
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
