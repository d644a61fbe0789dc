use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rek_catalog::CatalogError;
use rek_ledger::LedgerError;
use rek_report::ReportError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    /// Safe to resend unchanged.
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ServerError {
    fn classify(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            Self::Ledger(e) => match e {
                LedgerError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", None)
                }
                LedgerError::DuplicateNumber(number) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "duplicate_number",
                    Some(json!({ "number": number })),
                ),
                LedgerError::ReferenceNotFound { kind, id } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "reference_not_found",
                    Some(json!({ "kind": kind.to_string(), "id": id })),
                ),
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
                LedgerError::InvalidState { status, action, .. } => (
                    StatusCode::CONFLICT,
                    "invalid_state",
                    Some(json!({ "status": status, "action": action })),
                ),
                LedgerError::InsufficientStock {
                    component,
                    location,
                    on_hand,
                    requested,
                    shortfall,
                } => (
                    StatusCode::CONFLICT,
                    "insufficient_stock",
                    Some(json!({
                        "component": component,
                        "location": location,
                        "on_hand": on_hand,
                        "requested": requested,
                        "shortfall": shortfall,
                    })),
                ),
                LedgerError::Contention { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "contention", None)
                }
                LedgerError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
                }
            },
            Self::Catalog(e) => match e {
                CatalogError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", None),
                CatalogError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", None)
                }
                CatalogError::Duplicate { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "duplicate", None)
                }
                CatalogError::InUse { .. } => (StatusCode::CONFLICT, "in_use", None),
                CatalogError::Serialization(_) | CatalogError::Io(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
                }
            },
            Self::Report(ReportError::InvalidFilter(_)) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "bad_request", None)
            }
            Self::Report(ReportError::Catalog(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorResponse {
            code,
            message: self.to_string(),
            retryable: matches!(&self, Self::Ledger(e) if e.is_retryable()),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
