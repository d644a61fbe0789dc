use chrono::{DateTime, Utc};
use rek_types::DocumentId;
use serde::{Deserialize, Serialize};

use crate::records::{AuditEntry, Document, StockRow};

/// One committed ledger operation, as written to the journal.
///
/// Events carry post-state (whole rows and documents), so replaying them is
/// a sequence of overwrites and never re-runs validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    DocumentCreated {
        document: Document,
    },
    DocumentConfirmed {
        id: DocumentId,
        performed_by: String,
        at: DateTime<Utc>,
        rows: Vec<StockRow>,
        entries: Vec<AuditEntry>,
    },
    DocumentCancelled {
        id: DocumentId,
        performed_by: String,
        at: DateTime<Utc>,
    },
    StockAdjusted {
        row: StockRow,
        entry: AuditEntry,
    },
    InventoryApplied {
        document: Document,
        rows: Vec<StockRow>,
        entries: Vec<AuditEntry>,
    },
    ThresholdSet {
        row: StockRow,
    },
    CatalogRecorded {
        entry: AuditEntry,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DocumentCreated { .. } => "document_created",
            Self::DocumentConfirmed { .. } => "document_confirmed",
            Self::DocumentCancelled { .. } => "document_cancelled",
            Self::StockAdjusted { .. } => "stock_adjusted",
            Self::InventoryApplied { .. } => "inventory_applied",
            Self::ThresholdSet { .. } => "threshold_set",
            Self::CatalogRecorded { .. } => "catalog_recorded",
        }
    }
}
