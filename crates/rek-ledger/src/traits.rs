use rek_types::{ComponentId, DocumentId, LocationId, StockKey, SupplierId};

use crate::documents::DocumentFilter;
use crate::records::{AuditEntry, Document, StockRow};
use crate::stock::StockIter;

/// Reference-data boundary the engine validates documents against.
///
/// Implemented by the catalog; the engine never writes through it.
pub trait ReferenceData: Send + Sync {
    fn component_exists(&self, id: ComponentId) -> bool;

    fn location_exists(&self, id: LocationId) -> bool;

    fn supplier_exists(&self, id: SupplierId) -> bool;

    /// Threshold given to a stock row of this component when it is first created.
    fn minimum_stock(&self, _id: ComponentId) -> u64 {
        0
    }
}

/// Read boundary over the ledger's stores, used by reports and replay.
pub trait LedgerReader: Send + Sync {
    fn stock_rows(&self) -> StockIter;

    fn stock_row(&self, key: StockKey) -> Option<StockRow>;

    /// Every audit entry, oldest first.
    fn audit_entries(&self) -> Vec<AuditEntry>;

    fn component_history(
        &self,
        component: ComponentId,
        location: Option<LocationId>,
    ) -> Vec<AuditEntry>;

    fn document(&self, id: DocumentId) -> Option<Document>;

    fn documents(&self, filter: DocumentFilter) -> Vec<Document>;
}
