//! Error types for catalog operations.

use thiserror::Error;

/// Errors that can occur while reading or changing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No entity of this kind has the id.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// A field failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A unique field (code, part number) is already taken.
    #[error("{kind} {key:?} already exists")]
    Duplicate { kind: &'static str, key: String },

    /// The entity is still referenced and cannot be removed.
    #[error("{kind} {id} is still in use")]
    InUse { kind: &'static str, id: u64 },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while loading or saving the catalog file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
