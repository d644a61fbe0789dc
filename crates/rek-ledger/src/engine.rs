use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rek_journal::Journal;
use rek_types::{
    ActionType, ComponentId, DocumentId, DocumentKind, LocationId, StockKey, SupplierId,
};
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::config::EngineConfig;
use crate::documents::{DocumentFilter, DocumentStore};
use crate::error::{LedgerError, ReferenceKind, Result};
use crate::event::LedgerEvent;
use crate::records::{
    Adjustment, AuditDraft, AuditEntry, Confirmation, Document, Draft, DocumentLines, DocumentStatus,
    InventoryLine, InventoryOutcome, LineItem, NewDocument, NewInventory, NewLine, StockRow,
    MAX_ON_HAND,
};
use crate::stock::{StockIter, StockStore};
use crate::traits::{LedgerReader, ReferenceData};

/// File name of the journal inside the engine's data directory.
pub const JOURNAL_FILE: &str = "ledger.journal";

/// State that only changes under the commit lock.
struct CommitState {
    last_document: DocumentId,
}

/// The stock ledger engine.
///
/// Sole writer of stock rows, documents and the audit log. Each mutating
/// operation runs as one unit:
///
/// 1. lock the document (if any), then every touched stock row in key order;
/// 2. read current quantities and validate against them;
/// 3. under the commit lock, seal audit entries and append one journal event;
/// 4. install the new rows, document status and audit entries in memory.
///
/// Any failure before step 3 completes leaves memory and disk untouched.
pub struct LedgerEngine {
    config: EngineConfig,
    reference: Arc<dyn ReferenceData>,
    stock: StockStore,
    documents: DocumentStore,
    audit: AuditLog,
    journal: Journal,
    commit: Mutex<CommitState>,
}

impl LedgerEngine {
    /// Open the ledger stored in `dir`, replaying its journal.
    pub fn open(
        dir: &Path,
        reference: Arc<dyn ReferenceData>,
        config: EngineConfig,
    ) -> Result<Self> {
        let (journal, recovered) =
            Journal::open::<LedgerEvent>(&dir.join(JOURNAL_FILE), config.journal.clone())?;

        let engine = Self {
            config,
            reference,
            stock: StockStore::new(),
            documents: DocumentStore::new(),
            audit: AuditLog::new(),
            journal,
            commit: Mutex::new(CommitState {
                last_document: DocumentId(0),
            }),
        };

        let replayed = recovered.records.len();
        for event in recovered.records {
            engine.replay(event)?;
        }
        engine.commit.lock().last_document = engine.documents.last_id();

        let broken = engine.audit.verify_chain();
        if !broken.is_empty() {
            warn!(violations = broken.len(), first = %broken[0].description, "audit chain does not verify");
        }

        info!(
            dir = %dir.display(),
            events = replayed,
            documents = engine.documents.len(),
            audit_entries = engine.audit.len(),
            "ledger opened"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stock(&self) -> &StockStore {
        &self.stock
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn document_store(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn find_document(&self, number: &str) -> Option<Document> {
        self.documents.find_by_number(number)
    }

    // ── document lifecycle ──────────────────────────────────────────────

    /// Create a receipt or issue in `Draft` status. Touches no stock.
    pub fn create_draft(&self, new: NewDocument) -> Result<Document> {
        if new.kind == DocumentKind::Inventory {
            return Err(LedgerError::invalid(
                "inventory acts are applied in one step, not drafted",
            ));
        }
        let number = validate_number(&new.number)?;
        let lines = self.validate_lines(&new.lines)?;
        if new.kind == DocumentKind::Receipt {
            let supplier = new
                .supplier
                .ok_or_else(|| LedgerError::invalid("a receipt requires a supplier"))?;
            self.check_supplier(supplier)?;
        } else if let Some(supplier) = new.supplier {
            self.check_supplier(supplier)?;
        }

        let now = Utc::now();
        let mut commit = self.commit.lock();
        if self.documents.contains_number(&number) {
            return Err(LedgerError::DuplicateNumber(number));
        }
        let id = DocumentId(commit.last_document.get() + 1);
        let document = Document {
            id,
            number,
            kind: new.kind,
            status: DocumentStatus::Draft,
            supplier: new.supplier,
            invoice_number: new.invoice_number,
            department: new.department,
            requester: new.requester,
            purpose: new.purpose,
            notes: new.notes,
            created_by: new.created_by,
            created_at: now,
            closed_at: None,
            closed_by: None,
            lines: DocumentLines::Movement(lines),
        };

        self.journal.append(&LedgerEvent::DocumentCreated {
            document: document.clone(),
        })?;
        commit.last_document = id;
        self.documents.insert(document.clone());

        info!(
            document = %id,
            number = %document.number,
            kind = %document.kind,
            lines = document.lines.len(),
            "draft created"
        );
        Ok(document)
    }

    /// Apply a draft receipt or issue to stock, all lines or none.
    pub fn confirm(&self, id: DocumentId, performed_by: &str) -> Result<Confirmation> {
        self.with_retry("confirm", || self.try_confirm(id, performed_by))
    }

    /// Cancel a draft. No stock moves and nothing is audited.
    pub fn cancel(&self, id: DocumentId, performed_by: &str) -> Result<Document> {
        self.with_retry("cancel", || self.try_cancel(id, performed_by))
    }

    fn try_confirm(&self, id: DocumentId, performed_by: &str) -> Result<Confirmation> {
        let mut document = self.documents.lock(id, self.config.lock_timeout)?;
        let status = document.status;
        let Some(draft) = document.as_draft() else {
            return Err(LedgerError::InvalidState {
                document: id,
                status,
                action: "confirm",
            });
        };

        let kind = draft.document().kind;
        let number = draft.document().number.clone();
        let DocumentLines::Movement(lines) = &draft.document().lines else {
            return Err(LedgerError::Storage(format!(
                "document {id} has inventory lines but kind {kind}"
            )));
        };
        let lines = lines.clone();

        let mut rows = self
            .stock
            .lock(lines.iter().map(LineItem::key), self.config.lock_timeout)?;

        let mut requested: BTreeMap<StockKey, u64> = BTreeMap::new();
        for line in &lines {
            let total = requested.entry(line.key()).or_default();
            *total = total.saturating_add(line.quantity);
        }
        for (key, total) in &requested {
            let on_hand = rows.on_hand(*key);
            match kind {
                DocumentKind::Issue if *total > on_hand => {
                    debug!(document = %id, %key, on_hand, requested = total, "issue exceeds stock");
                    return Err(LedgerError::InsufficientStock {
                        component: key.component,
                        location: key.location,
                        on_hand,
                        requested: *total,
                        shortfall: total - on_hand,
                    });
                }
                DocumentKind::Receipt
                    if on_hand
                        .checked_add(*total)
                        .map_or(true, |after| after > MAX_ON_HAND) =>
                {
                    return Err(LedgerError::invalid(format!(
                        "receipt would overflow the quantity of {key}"
                    )));
                }
                DocumentKind::Inventory => {
                    return Err(LedgerError::Storage(format!(
                        "inventory act {id} cannot be confirmed"
                    )));
                }
                _ => {}
            }
        }

        let now = Utc::now();
        let mut changed: BTreeMap<StockKey, StockRow> = BTreeMap::new();
        let mut drafts = Vec::with_capacity(lines.len());
        for line in &lines {
            let key = line.key();
            let row = changed
                .entry(key)
                .or_insert_with(|| rows.row(key).cloned().unwrap_or_else(|| self.new_row(key, now)));
            let delta = line.quantity as i64;
            let delta = if kind == DocumentKind::Issue {
                row.on_hand -= line.quantity;
                -delta
            } else {
                row.on_hand += line.quantity;
                delta
            };
            drafts.push(AuditDraft {
                action: kind.action(),
                component: line.component,
                location: Some(line.location),
                quantity_delta: delta,
                resulting_quantity: Some(row.on_hand),
                document: Some(id),
                description: Some(format!("{kind} {number}")),
            });
        }
        let changed: Vec<StockRow> = changed.into_values().map(|row| touched(row, now)).collect();

        let entries = {
            let _commit = self.commit.lock();
            let entries = self.audit.seal(drafts, performed_by, now)?;
            self.journal.append(&LedgerEvent::DocumentConfirmed {
                id,
                performed_by: performed_by.to_string(),
                at: now,
                rows: changed.clone(),
                entries: entries.clone(),
            })?;
            for row in &changed {
                rows.write(row.clone());
            }
            draft.confirm(performed_by, now);
            self.audit.extend(&entries)?;
            entries
        };

        info!(
            document = %id,
            number = %number,
            kind = %kind,
            rows = changed.len(),
            performed_by,
            "document confirmed"
        );
        Ok(Confirmation {
            document: document.clone(),
            rows: changed,
            entries,
        })
    }

    fn try_cancel(&self, id: DocumentId, performed_by: &str) -> Result<Document> {
        let mut document = self.documents.lock(id, self.config.lock_timeout)?;
        let status = document.status;
        let Some(draft) = document.as_draft() else {
            return Err(LedgerError::InvalidState {
                document: id,
                status,
                action: "cancel",
            });
        };

        let now = Utc::now();
        {
            let _commit = self.commit.lock();
            self.journal.append(&LedgerEvent::DocumentCancelled {
                id,
                performed_by: performed_by.to_string(),
                at: now,
            })?;
            draft.cancel(performed_by, now);
        }

        info!(document = %id, performed_by, "document cancelled");
        Ok(document.clone())
    }

    // ── direct stock operations ─────────────────────────────────────────

    /// Set a row to an absolute quantity outside any document.
    ///
    /// A zero delta is still recorded, as an operator confirming the count.
    pub fn adjust(&self, adjustment: Adjustment) -> Result<(StockRow, AuditEntry)> {
        self.with_retry("adjust", || self.try_adjust(&adjustment))
    }

    fn try_adjust(&self, adjustment: &Adjustment) -> Result<(StockRow, AuditEntry)> {
        let new_quantity = u64::try_from(adjustment.new_quantity).map_err(|_| {
            LedgerError::invalid(format!(
                "new quantity must not be negative, got {}",
                adjustment.new_quantity
            ))
        })?;
        self.check_component(adjustment.component)?;
        self.check_location(adjustment.location)?;

        let key = StockKey::new(adjustment.component, adjustment.location);
        let mut rows = self.stock.lock([key], self.config.lock_timeout)?;

        let now = Utc::now();
        let mut row = rows
            .row(key)
            .cloned()
            .unwrap_or_else(|| self.new_row(key, now));
        let delta = signed_delta(row.on_hand, new_quantity)?;
        row.on_hand = new_quantity;
        let row = touched(row, now);

        let draft = AuditDraft {
            action: ActionType::Adjust,
            component: key.component,
            location: Some(key.location),
            quantity_delta: delta,
            resulting_quantity: Some(new_quantity),
            document: None,
            description: adjustment.reason.clone(),
        };

        let entry = {
            let _commit = self.commit.lock();
            let entry = self.seal_one(draft, &adjustment.performed_by, now)?;
            self.journal.append(&LedgerEvent::StockAdjusted {
                row: row.clone(),
                entry: entry.clone(),
            })?;
            rows.write(row.clone());
            self.audit.extend(std::slice::from_ref(&entry))?;
            entry
        };

        info!(
            %key,
            delta,
            on_hand = new_quantity,
            performed_by = %adjustment.performed_by,
            "stock adjusted"
        );
        Ok((row, entry))
    }

    /// Reconcile recorded stock with a physical count in one step.
    ///
    /// Only lines whose count differs from the record move stock and get an
    /// audit entry. The act itself is stored already confirmed.
    pub fn apply_inventory(&self, inventory: NewInventory) -> Result<InventoryOutcome> {
        self.with_retry("apply_inventory", || self.try_apply_inventory(&inventory))
    }

    fn try_apply_inventory(&self, inventory: &NewInventory) -> Result<InventoryOutcome> {
        let number = validate_number(&inventory.number)?;
        if inventory.lines.is_empty() {
            return Err(LedgerError::invalid("an inventory act needs at least one line"));
        }

        let mut counts = Vec::with_capacity(inventory.lines.len());
        let mut seen = BTreeSet::new();
        for (index, line) in inventory.lines.iter().enumerate() {
            let location = line.location.ok_or_else(|| {
                LedgerError::invalid(format!("line {}: location is required", index + 1))
            })?;
            let counted = u64::try_from(line.counted_quantity).map_err(|_| {
                LedgerError::invalid(format!(
                    "line {}: counted quantity must not be negative, got {}",
                    index + 1,
                    line.counted_quantity
                ))
            })?;
            self.check_component(line.component)?;
            self.check_location(location)?;
            let key = StockKey::new(line.component, location);
            if !seen.insert(key) {
                return Err(LedgerError::invalid(format!(
                    "line {}: {key} is counted twice",
                    index + 1
                )));
            }
            counts.push((key, counted));
        }

        let mut rows = self
            .stock
            .lock(counts.iter().map(|(key, _)| *key), self.config.lock_timeout)?;

        let now = Utc::now();
        let mut lines = Vec::with_capacity(counts.len());
        let mut changed = Vec::new();
        let mut drafts = Vec::new();
        for (key, counted) in counts {
            let existing = rows.row(key).cloned();
            let recorded = existing.as_ref().map_or(0, |r| r.on_hand);
            let discrepancy = signed_delta(recorded, counted)?;
            lines.push(InventoryLine {
                component: key.component,
                location: key.location,
                recorded_quantity: recorded,
                counted_quantity: counted,
                discrepancy,
            });

            if discrepancy == 0 && existing.is_some() {
                continue;
            }
            let mut row = existing.unwrap_or_else(|| self.new_row(key, now));
            row.on_hand = counted;
            changed.push(touched(row, now));

            if discrepancy != 0 {
                drafts.push(AuditDraft {
                    action: ActionType::Inventory,
                    component: key.component,
                    location: Some(key.location),
                    quantity_delta: discrepancy,
                    resulting_quantity: Some(counted),
                    document: None,
                    description: Some(format!("inventory {number}: discrepancy {discrepancy:+}")),
                });
            }
        }

        let (document, entries) = {
            let mut commit = self.commit.lock();
            if self.documents.contains_number(&number) {
                return Err(LedgerError::DuplicateNumber(number));
            }
            let id = DocumentId(commit.last_document.get() + 1);
            for draft in &mut drafts {
                draft.document = Some(id);
            }
            let entries = self.audit.seal(drafts, &inventory.created_by, now)?;
            let document = Document {
                id,
                number,
                kind: DocumentKind::Inventory,
                status: DocumentStatus::Confirmed,
                supplier: None,
                invoice_number: None,
                department: None,
                requester: None,
                purpose: None,
                notes: inventory.notes.clone(),
                created_by: inventory.created_by.clone(),
                created_at: now,
                closed_at: Some(now),
                closed_by: Some(inventory.created_by.clone()),
                lines: DocumentLines::Inventory(lines),
            };

            self.journal.append(&LedgerEvent::InventoryApplied {
                document: document.clone(),
                rows: changed.clone(),
                entries: entries.clone(),
            })?;
            commit.last_document = id;
            for row in &changed {
                rows.write(row.clone());
            }
            self.documents.insert(document.clone());
            self.audit.extend(&entries)?;
            (document, entries)
        };

        info!(
            document = %document.id,
            number = %document.number,
            lines = document.lines.len(),
            discrepancies = entries.len(),
            "inventory applied"
        );
        Ok(InventoryOutcome {
            document,
            rows: changed,
            entries,
        })
    }

    /// Change the informational reorder threshold of a row.
    ///
    /// Creates the row at zero quantity if needed. No quantity moves, so no
    /// audit entry is written.
    pub fn set_threshold(
        &self,
        component: ComponentId,
        location: LocationId,
        threshold: u64,
    ) -> Result<StockRow> {
        self.check_component(component)?;
        self.check_location(location)?;
        let key = StockKey::new(component, location);

        self.with_retry("set_threshold", || {
            let mut rows = self.stock.lock([key], self.config.lock_timeout)?;
            let now = Utc::now();
            let mut row = rows
                .row(key)
                .cloned()
                .unwrap_or_else(|| self.new_row(key, now));
            row.minimum_threshold = threshold;
            let row = touched(row, now);

            let _commit = self.commit.lock();
            self.journal
                .append(&LedgerEvent::ThresholdSet { row: row.clone() })?;
            rows.write(row.clone());
            debug!(%key, threshold, "threshold set");
            Ok(row)
        })
    }

    /// Record a catalog create / update / delete of a component.
    ///
    /// These are the only audit entries without a location; their delta is
    /// always zero. The component is not checked against reference data,
    /// since a deactivated component no longer resolves there.
    pub fn record_catalog_event(
        &self,
        action: ActionType,
        component: ComponentId,
        performed_by: &str,
        description: Option<String>,
    ) -> Result<AuditEntry> {
        if action.moves_stock() {
            return Err(LedgerError::invalid(format!(
                "{action} is a stock action, not a catalog event"
            )));
        }

        let draft = AuditDraft {
            action,
            component,
            location: None,
            quantity_delta: 0,
            resulting_quantity: None,
            document: None,
            description,
        };

        let _commit = self.commit.lock();
        let entry = self.seal_one(draft, performed_by, Utc::now())?;
        self.journal.append(&LedgerEvent::CatalogRecorded {
            entry: entry.clone(),
        })?;
        self.audit.extend(std::slice::from_ref(&entry))?;
        debug!(%component, %action, "catalog event recorded");
        Ok(entry)
    }

    // ── internals ───────────────────────────────────────────────────────

    fn with_retry<T>(&self, operation: &'static str, mut run: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match run() {
                Err(e) if e.is_retryable() && attempt < self.config.retry.max_attempts => {
                    attempt += 1;
                    let delay = self.config.retry.delay_before(attempt);
                    warn!(operation, attempt, error = %e, ?delay, "retrying after contention");
                    thread::sleep(delay);
                }
                outcome => return outcome,
            }
        }
    }

    fn seal_one(&self, draft: AuditDraft, performed_by: &str, at: DateTime<Utc>) -> Result<AuditEntry> {
        self.audit
            .seal(vec![draft], performed_by, at)?
            .pop()
            .ok_or_else(|| LedgerError::Storage("sealing produced no entry".into()))
    }

    fn new_row(&self, key: StockKey, now: DateTime<Utc>) -> StockRow {
        StockRow {
            component: key.component,
            location: key.location,
            on_hand: 0,
            minimum_threshold: self.reference.minimum_stock(key.component),
            version: 0,
            updated_at: now,
        }
    }

    fn validate_lines(&self, lines: &[NewLine]) -> Result<Vec<LineItem>> {
        if lines.is_empty() {
            return Err(LedgerError::invalid("a document needs at least one line"));
        }
        lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let location = line.location.ok_or_else(|| {
                    LedgerError::invalid(format!("line {}: location is required", index + 1))
                })?;
                let quantity = u64::try_from(line.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(|| {
                        LedgerError::invalid(format!(
                            "line {}: quantity must be positive, got {}",
                            index + 1,
                            line.quantity
                        ))
                    })?;
                self.check_component(line.component)?;
                self.check_location(location)?;
                Ok(LineItem {
                    component: line.component,
                    location,
                    quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect()
    }

    fn check_component(&self, id: ComponentId) -> Result<()> {
        if self.reference.component_exists(id) {
            Ok(())
        } else {
            Err(LedgerError::ReferenceNotFound {
                kind: ReferenceKind::Component,
                id: id.get(),
            })
        }
    }

    fn check_location(&self, id: LocationId) -> Result<()> {
        if self.reference.location_exists(id) {
            Ok(())
        } else {
            Err(LedgerError::ReferenceNotFound {
                kind: ReferenceKind::Location,
                id: id.get(),
            })
        }
    }

    fn check_supplier(&self, id: SupplierId) -> Result<()> {
        if self.reference.supplier_exists(id) {
            Ok(())
        } else {
            Err(LedgerError::ReferenceNotFound {
                kind: ReferenceKind::Supplier,
                id: id.get(),
            })
        }
    }

    /// Re-apply one journaled event while opening.
    fn replay(&self, event: LedgerEvent) -> Result<()> {
        let name = event.name();
        match event {
            LedgerEvent::DocumentCreated { document } => {
                self.documents.restore(document);
            }
            LedgerEvent::DocumentConfirmed {
                id,
                performed_by,
                at,
                rows,
                entries,
            } => {
                self.close_replayed(id, name, |draft| draft.confirm(&performed_by, at))?;
                rows.into_iter().for_each(|row| self.stock.restore(row));
                self.audit.extend(&entries)?;
            }
            LedgerEvent::DocumentCancelled {
                id,
                performed_by,
                at,
            } => {
                self.close_replayed(id, name, |draft| draft.cancel(&performed_by, at))?;
            }
            LedgerEvent::StockAdjusted { row, entry } => {
                self.stock.restore(row);
                self.audit.extend(std::slice::from_ref(&entry))?;
            }
            LedgerEvent::InventoryApplied {
                document,
                rows,
                entries,
            } => {
                self.documents.restore(document);
                rows.into_iter().for_each(|row| self.stock.restore(row));
                self.audit.extend(&entries)?;
            }
            LedgerEvent::ThresholdSet { row } => {
                self.stock.restore(row);
            }
            LedgerEvent::CatalogRecorded { entry } => {
                self.audit.extend(std::slice::from_ref(&entry))?;
            }
        }
        Ok(())
    }

    fn close_replayed(
        &self,
        id: DocumentId,
        event: &str,
        close: impl FnOnce(Draft<'_>),
    ) -> Result<()> {
        let mut document = self
            .documents
            .get(id)
            .ok_or_else(|| LedgerError::Storage(format!("{event} for unknown document {id}")))?;
        let draft = document.as_draft().ok_or_else(|| {
            LedgerError::Storage(format!("{event} for document {id} that is not a draft"))
        })?;
        close(draft);
        self.documents.restore(document);
        Ok(())
    }
}

impl LedgerReader for LedgerEngine {
    fn stock_rows(&self) -> StockIter {
        self.stock.rows()
    }

    fn stock_row(&self, key: StockKey) -> Option<StockRow> {
        self.stock.get(key)
    }

    fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    fn component_history(
        &self,
        component: ComponentId,
        location: Option<LocationId>,
    ) -> Vec<AuditEntry> {
        self.audit.for_component(component, location)
    }

    fn document(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(id)
    }

    fn documents(&self, filter: DocumentFilter) -> Vec<Document> {
        self.documents.list(filter)
    }
}

fn validate_number(number: &str) -> Result<String> {
    let number = number.trim();
    if number.is_empty() {
        return Err(LedgerError::invalid("document number must not be empty"));
    }
    Ok(number.to_string())
}

/// `to - from` as a signed delta.
fn signed_delta(from: u64, to: u64) -> Result<i64> {
    let from = i64::try_from(from).map_err(|_| LedgerError::invalid("quantity out of range"))?;
    let to = i64::try_from(to).map_err(|_| LedgerError::invalid("quantity out of range"))?;
    Ok(to - from)
}

fn touched(mut row: StockRow, now: DateTime<Utc>) -> StockRow {
    row.version += 1;
    row.updated_at = now;
    row
}
