use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rek_types::{DocumentId, DocumentKind};

use crate::error::{LedgerError, Result};
use crate::records::{Document, DocumentStatus};
use crate::stock::{acquire, Guard};

/// Durable-by-journal store of receipts, issues and inventory acts.
///
/// Each document sits behind its own lock so concurrent transitions of the
/// same document serialize, while different documents proceed in parallel.
#[derive(Default)]
pub struct DocumentStore {
    inner: RwLock<DocumentIndex>,
}

#[derive(Default)]
struct DocumentIndex {
    by_id: BTreeMap<DocumentId, Arc<Mutex<Document>>>,
    by_number: HashMap<String, DocumentId>,
}

/// Filter for [`DocumentStore::list`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub kind: Option<DocumentKind>,
    pub status: Option<DocumentStatus>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        let slot = self.inner.read().by_id.get(&id).cloned()?;
        let document = slot.lock().clone();
        Some(document)
    }

    pub fn find_by_number(&self, number: &str) -> Option<Document> {
        let id = *self.inner.read().by_number.get(number)?;
        self.get(id)
    }

    pub fn contains_number(&self, number: &str) -> bool {
        self.inner.read().by_number.contains_key(number)
    }

    /// Documents matching `filter`, newest first.
    pub fn list(&self, filter: DocumentFilter) -> Vec<Document> {
        let slots: Vec<_> = self.inner.read().by_id.values().rev().cloned().collect();
        slots
            .into_iter()
            .map(|slot| slot.lock().clone())
            .filter(|d| filter.kind.map_or(true, |k| d.kind == k))
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest id in use, zero when empty.
    pub(crate) fn last_id(&self) -> DocumentId {
        self.inner
            .read()
            .by_id
            .keys()
            .next_back()
            .copied()
            .unwrap_or(DocumentId(0))
    }

    /// Lock one document for a status transition.
    pub(crate) fn lock(&self, id: DocumentId, timeout: Duration) -> Result<Guard<Document>> {
        let slot = self
            .inner
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))?;
        acquire(&slot, timeout, id)
    }

    /// Add a new document. The caller has already checked the number is free.
    pub(crate) fn insert(&self, document: Document) {
        let mut inner = self.inner.write();
        inner.by_number.insert(document.number.clone(), document.id);
        inner.by_id.insert(document.id, Arc::new(Mutex::new(document)));
    }

    /// Replace a document while rebuilding from the journal.
    pub(crate) fn restore(&self, document: Document) {
        let existing = self.inner.read().by_id.get(&document.id).cloned();
        match existing {
            Some(slot) => *slot.lock() = document,
            None => self.insert(document),
        }
    }
}
