use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rek_types::{AuditSeq, ComponentId, LocationId};

use crate::error::{LedgerError, Result};
use crate::records::{AuditDraft, AuditEntry};
use crate::replay::{chain_violations, Violation};

/// Append-only, hash-chained log of every quantity change.
///
/// There is no update or delete. Entries are sealed (sequence number and
/// hash assigned) by the engine while it holds the commit lock, written to
/// the journal, and only then appended here.
#[derive(Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign sequence numbers and chain hashes to `drafts`, continuing the
    /// current tail. Nothing is appended.
    pub(crate) fn seal(
        &self,
        drafts: Vec<AuditDraft>,
        performed_by: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<AuditEntry>> {
        let (mut seq, mut prev_hash) = {
            let entries = self.entries.read();
            entries
                .last()
                .map_or((AuditSeq(0), [0; 32]), |e| (e.seq, e.entry_hash))
        };

        let mut sealed = Vec::with_capacity(drafts.len());
        for draft in drafts {
            seq = seq.next();
            let mut entry = AuditEntry {
                seq,
                timestamp: at,
                action: draft.action,
                component: draft.component,
                location: draft.location,
                quantity_delta: draft.quantity_delta,
                resulting_quantity: draft.resulting_quantity,
                performed_by: performed_by.to_string(),
                document: draft.document,
                description: draft.description,
                prev_hash,
                entry_hash: [0; 32],
            };
            entry.entry_hash = entry_hash(&entry)?;
            prev_hash = entry.entry_hash;
            sealed.push(entry);
        }
        Ok(sealed)
    }

    /// Append sealed entries. They must continue the chain exactly.
    pub(crate) fn extend(&self, sealed: &[AuditEntry]) -> Result<()> {
        let mut entries = self.entries.write();
        for entry in sealed {
            let (expected_seq, expected_prev) = entries
                .last()
                .map_or((AuditSeq(1), [0; 32]), |e| (e.seq.next(), e.entry_hash));
            if entry.seq != expected_seq || entry.prev_hash != expected_prev {
                return Err(LedgerError::Storage(format!(
                    "audit entry {} does not continue the chain at {}",
                    entry.seq, expected_seq
                )));
            }
            entries.push(entry.clone());
        }
        Ok(())
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    /// Entries for one component, optionally narrowed to one location, oldest first.
    pub fn for_component(
        &self,
        component: ComponentId,
        location: Option<LocationId>,
    ) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.component == component)
            .filter(|e| location.map_or(true, |l| e.location == Some(l)))
            .cloned()
            .collect()
    }

    /// Entries with `from <= seq <= to`.
    pub fn range(&self, from: AuditSeq, to: AuditSeq) -> Vec<AuditEntry> {
        let entries = self.entries.read();
        // seq n lives at index n - 1
        let start = from.get().max(1) as usize - 1;
        let end = (to.get() as usize).min(entries.len());
        if start >= end {
            return Vec::new();
        }
        entries[start..end].to_vec()
    }

    /// Sequence and hash-chain problems in the current log.
    pub fn verify_chain(&self) -> Vec<Violation> {
        chain_violations(&self.entries.read())
    }

    pub fn head(&self) -> Option<AuditEntry> {
        self.entries.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// BLAKE3 hash of an entry's canonical JSON encoding with `entry_hash` zeroed.
pub fn entry_hash(entry: &AuditEntry) -> Result<[u8; 32]> {
    let mut canonical = entry.clone();
    canonical.entry_hash = [0; 32];
    let encoded =
        serde_json::to_vec(&canonical).map_err(|e| LedgerError::Storage(e.to_string()))?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(b"rek-audit-v1:");
    hasher.update(&encoded);
    Ok(*hasher.finalize().as_bytes())
}
