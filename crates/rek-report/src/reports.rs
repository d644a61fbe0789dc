use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rek_catalog::{Catalog, ComponentQuery};
use rek_ledger::{AuditEntry, LedgerReader, StockRow};
use rek_types::{ActionType, AuditSeq, ComponentId, DocumentId, LocationId};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Most rows a movement report returns.
pub const MOVEMENT_REPORT_LIMIT: usize = 500;
/// Page size of an audit listing when none is given.
pub const AUDIT_DEFAULT_LIMIT: usize = 100;
/// Largest page an audit listing accepts.
pub const AUDIT_MAX_LIMIT: usize = 1000;

/// One row of the stock summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockLine {
    pub component: ComponentId,
    pub location: LocationId,
    pub on_hand: u64,
    pub minimum_threshold: u64,
    pub is_below_minimum: bool,
}

impl From<StockRow> for StockLine {
    fn from(row: StockRow) -> Self {
        Self {
            component: row.component,
            location: row.location,
            on_hand: row.on_hand,
            minimum_threshold: row.minimum_threshold,
            is_below_minimum: row.is_below_minimum(),
        }
    }
}

/// Stock of one catalog component summed over all locations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentTotal {
    pub component: ComponentId,
    pub part_number: String,
    pub name: String,
    pub category: String,
    pub total_quantity: u64,
    pub min_stock: u64,
    pub is_below_min: bool,
    pub unit_price: Option<f64>,
    pub total_value: Option<f64>,
}

/// Narrows a movement report. Both window ends are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MovementFilter {
    pub component: Option<ComponentId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// One stock movement as shown in the movement report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub seq: AuditSeq,
    pub date: DateTime<Utc>,
    pub action: ActionType,
    pub component: ComponentId,
    pub location: Option<LocationId>,
    pub quantity_before: Option<u64>,
    pub quantity_after: Option<u64>,
    pub delta: i64,
    pub document: Option<DocumentId>,
    pub description: Option<String>,
    pub performed_by: String,
}

impl From<&AuditEntry> for Movement {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            seq: entry.seq,
            date: entry.timestamp,
            action: entry.action,
            component: entry.component,
            location: entry.location,
            quantity_before: entry.quantity_before(),
            quantity_after: entry.resulting_quantity,
            delta: entry.quantity_delta,
            document: entry.document,
            description: entry.description.clone(),
            performed_by: entry.performed_by.clone(),
        }
    }
}

/// Narrows and pages the raw audit listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    pub component: Option<ComponentId>,
    pub action: Option<ActionType>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Deterministic report builders.
pub struct ReportBuilder;

impl ReportBuilder {
    /// Every stock row, lazily, optionally only those below their threshold.
    ///
    /// Each row is a committed state of that row at the moment it is reached.
    pub fn stock_summary<R: LedgerReader + ?Sized>(
        reader: &R,
        below_min_only: bool,
    ) -> impl Iterator<Item = StockLine> {
        reader
            .stock_rows()
            .filter(move |row| !below_min_only || row.is_below_minimum())
            .map(StockLine::from)
    }

    /// Audit entries of one component, optionally one location, oldest first.
    pub fn movement_history<R: LedgerReader + ?Sized>(
        reader: &R,
        component: ComponentId,
        location: Option<LocationId>,
    ) -> Vec<AuditEntry> {
        reader.component_history(component, location)
    }

    /// Per active component: total on hand, reorder status and stock value.
    pub fn component_totals<R: LedgerReader + ?Sized>(
        reader: &R,
        catalog: &Catalog,
        below_min_only: bool,
    ) -> Vec<ComponentTotal> {
        let mut on_hand: BTreeMap<ComponentId, u64> = BTreeMap::new();
        for row in reader.stock_rows() {
            let total = on_hand.entry(row.component).or_default();
            *total = total.saturating_add(row.on_hand);
        }
        let categories: BTreeMap<_, _> = catalog
            .categories()
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        catalog
            .components(&ComponentQuery::default())
            .into_iter()
            .map(|component| {
                let total_quantity = on_hand.get(&component.id).copied().unwrap_or(0);
                ComponentTotal {
                    category: categories
                        .get(&component.category)
                        .cloned()
                        .unwrap_or_default(),
                    is_below_min: total_quantity < component.min_stock,
                    total_value: component.unit_price.map(|p| p * total_quantity as f64),
                    component: component.id,
                    part_number: component.part_number,
                    name: component.name,
                    total_quantity,
                    min_stock: component.min_stock,
                    unit_price: component.unit_price,
                }
            })
            .filter(|total| !below_min_only || total.is_below_min)
            .collect()
    }

    /// Quantity-moving entries, newest first, at most
    /// [`MOVEMENT_REPORT_LIMIT`] of them.
    pub fn movement_report<R: LedgerReader + ?Sized>(
        reader: &R,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ReportError::InvalidFilter(format!(
                    "window starts at {from} after it ends at {to}"
                )));
            }
        }
        let entries = match filter.component {
            Some(component) => reader.component_history(component, None),
            None => reader.audit_entries(),
        };
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.action.moves_stock())
            .filter(|e| filter.from.map_or(true, |from| e.timestamp >= from))
            .filter(|e| filter.to.map_or(true, |to| e.timestamp <= to))
            .take(MOVEMENT_REPORT_LIMIT)
            .map(Movement::from)
            .collect())
    }

    /// Raw audit entries, newest first, filtered and paged.
    pub fn audit_log<R: LedgerReader + ?Sized>(
        reader: &R,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>> {
        let limit = filter.limit.unwrap_or(AUDIT_DEFAULT_LIMIT);
        if limit > AUDIT_MAX_LIMIT {
            return Err(ReportError::InvalidFilter(format!(
                "limit {limit} exceeds {AUDIT_MAX_LIMIT}"
            )));
        }
        let entries = match filter.component {
            Some(component) => reader.component_history(component, None),
            None => reader.audit_entries(),
        };
        Ok(entries
            .into_iter()
            .rev()
            .filter(|e| filter.action.map_or(true, |a| e.action == a))
            .skip(filter.offset)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rek_catalog::{NewCategory, NewComponent};
    use rek_ledger::{
        Adjustment, EngineConfig, LedgerEngine, NewDocument, StaticReferenceData,
    };
    use rek_types::SupplierId;
    use tempfile::TempDir;

    use super::*;

    const C1: ComponentId = ComponentId(1);
    const C2: ComponentId = ComponentId(2);
    const L1: LocationId = LocationId(1);
    const L2: LocationId = LocationId(2);

    /// Ledger with C1: 50 @ L1 (after 100 in, 50 out) and 5 @ L2; C2: 10 @ L1.
    fn ledger(dir: &TempDir) -> LedgerEngine {
        let refs = StaticReferenceData::with_ranges(3, 3, 1)
            .component(C1, 80)
            .component(C2, 5);
        let engine =
            LedgerEngine::open(dir.path(), Arc::new(refs), EngineConfig::default()).unwrap();

        let receipt = engine
            .create_draft(
                NewDocument::receipt("RCP-1", SupplierId(1), "clerk")
                    .line(C1, L1, 100)
                    .line(C1, L2, 5)
                    .line(C2, L1, 10),
            )
            .unwrap();
        engine.confirm(receipt.id, "clerk").unwrap();
        let issue = engine
            .create_draft(NewDocument::issue("ISS-1", "fitter").line(C1, L1, 50))
            .unwrap();
        engine.confirm(issue.id, "fitter").unwrap();
        engine
            .record_catalog_event(ActionType::Update, C2, "admin", None)
            .unwrap();
        engine
    }

    #[test]
    fn summary_flags_rows_below_threshold() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);

        let all: Vec<_> = ReportBuilder::stock_summary(&engine, false).collect();
        assert_eq!(all.len(), 3);

        let low: Vec<_> = ReportBuilder::stock_summary(&engine, true).collect();
        let keys: Vec<_> = low.iter().map(|l| (l.component, l.location)).collect();
        assert_eq!(keys, vec![(C1, L1), (C1, L2)]);
        assert!(low.iter().all(|l| l.is_below_minimum));
    }

    #[test]
    fn history_is_oldest_first_and_narrowable() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);

        let history = ReportBuilder::movement_history(&engine, C1, Some(L1));
        let deltas: Vec<_> = history.iter().map(|e| e.quantity_delta).collect();
        assert_eq!(deltas, vec![100, -50]);
        assert_eq!(ReportBuilder::movement_history(&engine, C1, None).len(), 3);
    }

    #[test]
    fn movement_report_skips_catalog_events() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);

        let movements = ReportBuilder::movement_report(&engine, &MovementFilter::default()).unwrap();
        assert_eq!(movements.len(), 4);
        assert_eq!(movements[0].action, ActionType::Issue);
        assert_eq!(movements[0].quantity_before, Some(100));
        assert_eq!(movements[0].quantity_after, Some(50));

        let only_c2 = ReportBuilder::movement_report(
            &engine,
            &MovementFilter {
                component: Some(C2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(only_c2.len(), 1);

        let future = Utc::now() + chrono::Duration::hours(1);
        let none = ReportBuilder::movement_report(
            &engine,
            &MovementFilter {
                from: Some(future),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(none.is_empty());

        let inverted = MovementFilter {
            from: Some(future),
            to: Some(Utc::now()),
            ..Default::default()
        };
        assert!(matches!(
            ReportBuilder::movement_report(&engine, &inverted),
            Err(ReportError::InvalidFilter(_))
        ));
    }

    #[test]
    fn audit_log_pages_newest_first() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);
        engine
            .adjust(Adjustment {
                component: C2,
                location: L1,
                new_quantity: 9,
                reason: Some("dropped".into()),
                performed_by: "auditor".into(),
            })
            .unwrap();

        let page = ReportBuilder::audit_log(
            &engine,
            &AuditFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        let seqs: Vec<_> = page.iter().map(|e| e.seq.get()).collect();
        assert_eq!(seqs, vec![6, 5]);

        let receipts = ReportBuilder::audit_log(
            &engine,
            &AuditFilter {
                action: Some(ActionType::Receipt),
                offset: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(receipts.len(), 2);

        let too_big = AuditFilter {
            limit: Some(AUDIT_MAX_LIMIT + 1),
            ..Default::default()
        };
        assert!(ReportBuilder::audit_log(&engine, &too_big).is_err());
    }

    #[test]
    fn totals_sum_locations_and_value_stock() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);

        let catalog = Catalog::in_memory();
        let res = catalog
            .create_category(NewCategory {
                code: "RES".into(),
                name: "Resistors".into(),
                description: None,
            })
            .unwrap();
        for (part, min_stock, price) in [("R-10K", 80, Some(0.5)), ("R-100R", 5, None)] {
            catalog
                .create_component(NewComponent {
                    part_number: part.into(),
                    name: part.into(),
                    category: res.id,
                    manufacturer: None,
                    description: None,
                    unit: None,
                    package: None,
                    min_stock,
                    unit_price: price,
                    datasheet_url: None,
                })
                .unwrap();
        }

        let totals = ReportBuilder::component_totals(&engine, &catalog, false);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].total_quantity, 55);
        assert!(totals[0].is_below_min);
        assert_eq!(totals[0].total_value, Some(27.5));
        assert_eq!(totals[0].category, "Resistors");
        assert_eq!(totals[1].total_quantity, 10);
        assert_eq!(totals[1].total_value, None);

        let low = ReportBuilder::component_totals(&engine, &catalog, true);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].component, C1);
    }

    #[test]
    fn totals_saturate_instead_of_wrapping() {
        let dir = TempDir::new().unwrap();
        let engine = ledger(&dir);
        for location in [L1, L2, LocationId(3)] {
            engine
                .adjust(Adjustment {
                    component: C1,
                    location,
                    new_quantity: i64::MAX,
                    reason: None,
                    performed_by: "auditor".into(),
                })
                .unwrap();
        }

        let catalog = Catalog::in_memory();
        let cat = catalog
            .create_category(NewCategory {
                code: "IC".into(),
                name: "Chips".into(),
                description: None,
            })
            .unwrap();
        catalog
            .create_component(NewComponent {
                part_number: "NE555".into(),
                name: "Timer".into(),
                category: cat.id,
                manufacturer: None,
                description: None,
                unit: None,
                package: None,
                min_stock: 0,
                unit_price: None,
                datasheet_url: None,
            })
            .unwrap();

        let totals = ReportBuilder::component_totals(&engine, &catalog, false);
        assert_eq!(totals[0].component, C1);
        assert_eq!(totals[0].total_quantity, u64::MAX);
    }
}
