use rek_types::{ComponentId, DocumentId, LocationId};

use crate::records::DocumentStatus;

/// Which kind of reference-data identifier failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    Component,
    Location,
    Supplier,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Component => "component",
            Self::Location => "location",
            Self::Supplier => "supplier",
        })
    }
}

/// Errors produced by ledger operations.
///
/// Every variant is terminal for the request that triggered it. Only
/// [`LedgerError::Contention`] is safe to retry automatically, because an
/// aborted operation leaves no effect behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    ReferenceNotFound { kind: ReferenceKind, id: u64 },

    #[error("document number {0:?} is already in use")]
    DuplicateNumber(String),

    #[error("document {0} not found")]
    NotFound(DocumentId),

    #[error("cannot {action} document {document} in status {status}")]
    InvalidState {
        document: DocumentId,
        status: DocumentStatus,
        action: &'static str,
    },

    #[error(
        "insufficient stock of {component} at {location}: on hand {on_hand}, requested {requested}, short by {shortfall}"
    )]
    InsufficientStock {
        component: ComponentId,
        location: LocationId,
        on_hand: u64,
        requested: u64,
        shortfall: u64,
    },

    #[error("timed out waiting for {resource}")]
    Contention { resource: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns `true` if the operation may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<rek_journal::JournalError> for LedgerError {
    fn from(e: rek_journal::JournalError) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
