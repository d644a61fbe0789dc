use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use rek_types::StockKey;
use tracing::warn;

use crate::error::{LedgerError, Result};
use crate::records::StockRow;

/// Exclusive hold on one lockable record, owned independently of its store.
pub(crate) type Guard<T> = ArcMutexGuard<RawMutex, T>;

/// Lock `slot`, giving up after `timeout` with a retryable error.
pub(crate) fn acquire<T>(
    slot: &Arc<Mutex<T>>,
    timeout: Duration,
    resource: impl Display,
) -> Result<Guard<T>> {
    slot.try_lock_arc_for(timeout).ok_or_else(|| {
        warn!(%resource, ?timeout, "lock wait timed out");
        LedgerError::Contention {
            resource: resource.to_string(),
        }
    })
}

/// A lockable place for one stock row. `None` until the first committed
/// movement into the pair, so a lock taken by an aborted operation never
/// materializes a row.
type Slot = Arc<Mutex<Option<StockRow>>>;

/// Current stock, one independently lockable row per `(component, location)`.
///
/// The map itself is only locked long enough to find or insert a slot;
/// operations on disjoint rows never wait on each other.
#[derive(Default)]
pub struct StockStore {
    slots: RwLock<BTreeMap<StockKey, Slot>>,
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: StockKey) -> Slot {
        if let Some(slot) = self.slots.read().get(&key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(key).or_default())
    }

    /// Lock every row in `keys`, in key order, waiting at most `timeout` per row.
    ///
    /// Acquiring in a single global order rules out deadlock between two
    /// operations that share more than one row.
    pub(crate) fn lock(
        &self,
        keys: impl IntoIterator<Item = StockKey>,
        timeout: Duration,
    ) -> Result<RowLocks> {
        let ordered: BTreeSet<StockKey> = keys.into_iter().collect();
        let mut guards = BTreeMap::new();
        for key in ordered {
            let guard = acquire(&self.slot(key), timeout, key)?;
            guards.insert(key, guard);
        }
        Ok(RowLocks { guards })
    }

    /// Read one row. Waits for a writer holding it to finish.
    pub fn get(&self, key: StockKey) -> Option<StockRow> {
        let slot = self.slots.read().get(&key).cloned()?;
        let row = slot.lock().clone();
        row
    }

    /// Lazily iterate all materialized rows in key order.
    ///
    /// The set of rows is fixed when the iterator is created; each row is
    /// read under its own lock when reached, so every item is a committed
    /// state of that row, though not one snapshot across rows.
    pub fn rows(&self) -> StockIter {
        let slots: Vec<Slot> = self.slots.read().values().cloned().collect();
        StockIter {
            slots: slots.into_iter(),
        }
    }

    /// Number of materialized rows.
    pub fn len(&self) -> usize {
        self.rows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a row while rebuilding from the journal.
    pub(crate) fn restore(&self, row: StockRow) {
        let key = row.key();
        *self.slot(key).lock() = Some(row);
    }
}

/// Rows held exclusively by one in-flight operation.
pub(crate) struct RowLocks {
    guards: BTreeMap<StockKey, Guard<Option<StockRow>>>,
}

impl RowLocks {
    pub fn row(&self, key: StockKey) -> Option<&StockRow> {
        self.guards.get(&key).and_then(|g| g.as_ref())
    }

    /// On-hand quantity, zero for a row that does not exist yet.
    pub fn on_hand(&self, key: StockKey) -> u64 {
        self.row(key).map_or(0, |r| r.on_hand)
    }

    /// Overwrite a locked row. Rows not held by this set are ignored.
    pub fn write(&mut self, row: StockRow) {
        let key = row.key();
        match self.guards.get_mut(&key) {
            Some(guard) => **guard = Some(row),
            None => debug_assert!(false, "write to unlocked row {key}"),
        }
    }
}

/// Iterator over stock rows, see [`StockStore::rows`].
pub struct StockIter {
    slots: std::vec::IntoIter<Slot>,
}

impl Iterator for StockIter {
    type Item = StockRow;

    fn next(&mut self) -> Option<StockRow> {
        loop {
            let slot = self.slots.next()?;
            let row = slot.lock().clone();
            if row.is_some() {
                return row;
            }
        }
    }
}
