//! Foundation types for the rek component warehouse ledger.
//!
//! Every other rek crate depends on `rek-types`. It carries the identifiers
//! and closed vocabularies shared across the stock ledger, the reference-data
//! catalog and the HTTP boundary.
//!
//! # Key Types
//!
//! - [`ComponentId`], [`LocationId`], [`SupplierId`]: reference-data identifiers
//! - [`DocumentId`]: surrogate identifier of a receipt, issue or inventory act
//! - [`AuditSeq`]: monotonically increasing audit sequence number
//! - [`StockKey`]: the `(component, location)` pair a stock row is keyed by
//! - [`ActionType`]: what kind of operation produced an audit entry
//! - [`DocumentKind`]: receipt, issue or inventory act

pub mod action;
pub mod error;
pub mod ids;
pub mod key;

pub use action::{ActionType, DocumentKind};
pub use error::TypeError;
pub use ids::{AuditSeq, CategoryId, ComponentId, DocumentId, LocationId, ManufacturerId, SupplierId};
pub use key::StockKey;
