//! Error types for reshape primitives

use thiserror::Error;

/// Reshape error types
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// A field map entry is missing a required component.
    #[error("Invalid field map: {0}")]
    InvalidFieldMap(String),
    /// A type kind name did not match any built-in kind.
    #[error("Unknown type kind: {0}")]
    UnknownTypeKind(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReshapeError>;
