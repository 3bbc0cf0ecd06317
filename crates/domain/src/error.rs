//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A variable name is empty or contains invalid characters.
    #[error("invalid variable name: {0}")]
    InvalidVariableName(String),

    /// The variable type discriminant is not recognized.
    #[error("unknown variable type: {0}")]
    UnknownVariableType(String),

    /// An interval string such as `5m` could not be parsed.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// A regex option filter could not be compiled.
    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    /// A time range expression could not be parsed.
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// A numeric enum discriminant was out of range.
    #[error("invalid {kind} value: {value}")]
    InvalidDiscriminant {
        /// The enum being decoded.
        kind: &'static str,
        /// The raw value that was rejected.
        value: u8,
    },
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
