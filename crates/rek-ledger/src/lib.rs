//! Stock ledger engine for rek.
//!
//! This crate is the only writer of stock. It provides:
//! - Receipt and issue documents with a draft / confirmed / cancelled lifecycle
//! - Immediate adjustments and one-step inventory reconciliation
//! - Per-row locking so operations on disjoint rows never wait on each other
//! - A hash-chained, append-only audit log of every quantity change
//! - Journal-backed durability with replay on open
//! - Reconstruction and integrity verification from the audit log

pub mod audit;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod event;
pub mod records;
pub mod reference;
pub mod replay;
pub mod stock;
pub mod traits;

pub use audit::AuditLog;
pub use config::{EngineConfig, RetryConfig};
pub use documents::{DocumentFilter, DocumentStore};
pub use engine::LedgerEngine;
pub use error::{LedgerError, ReferenceKind, Result};
pub use event::LedgerEvent;
pub use records::{
    Adjustment, AuditEntry, Confirmation, Document, DocumentLines, DocumentStatus, Draft,
    InventoryCount, InventoryLine, InventoryOutcome, LineItem, NewDocument, NewInventory, NewLine,
    StockRow, MAX_ON_HAND,
};
pub use reference::StaticReferenceData;
pub use replay::{reconstruct, verify, ValidationReport, Violation, ViolationKind};
pub use stock::{StockIter, StockStore};
pub use traits::{LedgerReader, ReferenceData};
