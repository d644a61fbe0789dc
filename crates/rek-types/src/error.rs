use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("unknown document kind: {0}")]
    UnknownKind(String),
}
