//! Read-only reports over the rek stock ledger.
//!
//! Reports never write. They read the ledger through
//! [`rek_ledger::LedgerReader`] and, for totals and prices, the catalog.

pub mod error;
pub mod reports;

pub use error::{ReportError, Result};
pub use reports::{
    AuditFilter, ComponentTotal, Movement, MovementFilter, ReportBuilder, StockLine,
    AUDIT_DEFAULT_LIMIT, AUDIT_MAX_LIMIT, MOVEMENT_REPORT_LIMIT,
};
