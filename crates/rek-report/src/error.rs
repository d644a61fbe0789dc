use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A filter parameter is out of range or inconsistent.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Reading reference data failed.
    #[error(transparent)]
    Catalog(#[from] rek_catalog::CatalogError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
