//! Rebuilding stock from the audit log and checking the log's integrity.

use std::collections::BTreeMap;

use rek_types::StockKey;
use serde::Serialize;

use crate::audit::entry_hash;
use crate::records::AuditEntry;
use crate::traits::LedgerReader;

/// Fold audit deltas per stock row, starting every row from zero.
///
/// Catalog events have no location and are skipped. The fold is signed so a
/// corrupted log shows up as a negative balance instead of wrapping.
pub fn reconstruct(entries: &[AuditEntry]) -> BTreeMap<StockKey, i64> {
    let mut balances = BTreeMap::new();
    for entry in entries {
        if let Some(key) = entry.key() {
            *balances.entry(key).or_insert(0) += entry.quantity_delta;
        }
    }
    balances
}

/// Result of [`verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub entry_count: u64,
    pub rows_checked: u64,
    pub chain_valid: bool,
    pub sequence_monotonic: bool,
    pub reconstructable: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// One integrity problem found by [`verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Audit sequence the problem was found at, zero for row-level problems.
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    /// An entry's `resulting_quantity` disagrees with the running fold.
    ResultMismatch,
    /// Running fold for a row went below zero.
    NegativeBalance,
    /// Final fold disagrees with the live stock row.
    QuantityMismatch,
}

/// Sequence and hash-chain checks over entries in log order.
pub fn chain_violations(entries: &[AuditEntry]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut prev_hash = [0u8; 32];

    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq.get() != expected_seq {
            violations.push(Violation {
                seq: entry.seq.get(),
                kind: ViolationKind::SequenceGap,
                description: format!("expected seq {expected_seq}, got {}", entry.seq),
            });
        }

        if entry.prev_hash != prev_hash {
            violations.push(Violation {
                seq: entry.seq.get(),
                kind: ViolationKind::HashChainBreak,
                description: "previous hash link mismatch".into(),
            });
        }

        match entry_hash(entry) {
            Ok(computed) if computed == entry.entry_hash => {}
            Ok(_) => violations.push(Violation {
                seq: entry.seq.get(),
                kind: ViolationKind::HashMismatch,
                description: "entry hash does not match its content".into(),
            }),
            Err(e) => violations.push(Violation {
                seq: entry.seq.get(),
                kind: ViolationKind::HashMismatch,
                description: format!("entry could not be hashed: {e}"),
            }),
        }
        prev_hash = entry.entry_hash;
    }
    violations
}

/// Check the whole ledger: the audit chain, every entry's running balance,
/// and that folding the log reproduces every live stock row.
pub fn verify<R: LedgerReader + ?Sized>(reader: &R) -> ValidationReport {
    let entries = reader.audit_entries();
    let mut violations = chain_violations(&entries);
    let chain_valid = !violations
        .iter()
        .any(|v| matches!(v.kind, ViolationKind::HashChainBreak | ViolationKind::HashMismatch));
    let sequence_monotonic = !violations
        .iter()
        .any(|v| v.kind == ViolationKind::SequenceGap);

    let mut running: BTreeMap<StockKey, i64> = BTreeMap::new();
    for entry in &entries {
        let Some(key) = entry.key() else { continue };
        let balance = running.entry(key).or_insert(0);
        *balance += entry.quantity_delta;
        if *balance < 0 {
            violations.push(Violation {
                seq: entry.seq.get(),
                kind: ViolationKind::NegativeBalance,
                description: format!("{key} falls to {balance}"),
            });
        }
        if let Some(after) = entry.resulting_quantity {
            if after as i64 != *balance {
                violations.push(Violation {
                    seq: entry.seq.get(),
                    kind: ViolationKind::ResultMismatch,
                    description: format!(
                        "{key} records {after} after the entry, fold gives {balance}"
                    ),
                });
            }
        }
    }

    let mut rows_checked = 0;
    for row in reader.stock_rows() {
        rows_checked += 1;
        let folded = running.remove(&row.key()).unwrap_or(0);
        if folded != row.on_hand as i64 {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::QuantityMismatch,
                description: format!(
                    "{} holds {} but the log folds to {folded}",
                    row.key(),
                    row.on_hand
                ),
            });
        }
    }
    // Any key left over has history but no row.
    for (key, folded) in running {
        if folded != 0 {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::QuantityMismatch,
                description: format!("{key} has no stock row but the log folds to {folded}"),
            });
        }
    }
    let reconstructable = !violations.iter().any(|v| {
        matches!(
            v.kind,
            ViolationKind::QuantityMismatch
                | ViolationKind::ResultMismatch
                | ViolationKind::NegativeBalance
        )
    });

    ValidationReport {
        entry_count: entries.len() as u64,
        rows_checked,
        chain_valid,
        sequence_monotonic,
        reconstructable,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rek_types::{ActionType, ComponentId, LocationId};

    use super::*;
    use crate::audit::AuditLog;
    use crate::records::AuditDraft;

    fn movement(component: u64, location: u64, delta: i64, after: u64) -> AuditDraft {
        AuditDraft {
            action: if delta < 0 {
                ActionType::Issue
            } else {
                ActionType::Receipt
            },
            component: ComponentId(component),
            location: Some(LocationId(location)),
            quantity_delta: delta,
            resulting_quantity: Some(after),
            document: None,
            description: None,
        }
    }

    fn sealed(drafts: Vec<AuditDraft>) -> Vec<AuditEntry> {
        let log = AuditLog::new();
        let entries = log.seal(drafts, "clerk", Utc::now()).unwrap();
        log.extend(&entries).unwrap();
        entries
    }

    #[test]
    fn reconstruct_folds_per_key() {
        let mut drafts = vec![
            movement(1, 1, 50, 50),
            movement(1, 2, 5, 5),
            movement(1, 1, -30, 20),
        ];
        drafts.push(AuditDraft {
            action: ActionType::Update,
            component: ComponentId(1),
            location: None,
            quantity_delta: 0,
            resulting_quantity: None,
            document: None,
            description: None,
        });
        let balances = reconstruct(&sealed(drafts));

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[&StockKey::new(ComponentId(1), LocationId(1))], 20);
        assert_eq!(balances[&StockKey::new(ComponentId(1), LocationId(2))], 5);
    }

    #[test]
    fn clean_chain_has_no_violations() {
        let entries = sealed(vec![movement(1, 1, 5, 5), movement(2, 1, 3, 3)]);
        assert!(chain_violations(&entries).is_empty());
    }

    #[test]
    fn tampering_is_detected() {
        let mut entries = sealed(vec![
            movement(1, 1, 5, 5),
            movement(1, 1, 5, 10),
            movement(1, 1, -2, 8),
        ]);
        entries[1].quantity_delta = 50;
        let kinds: Vec<_> = chain_violations(&entries).iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::HashMismatch]);

        entries.remove(1);
        let kinds: Vec<_> = chain_violations(&entries).iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ViolationKind::SequenceGap));
        assert!(kinds.contains(&ViolationKind::HashChainBreak));
    }
}
