use std::fmt;

use chrono::{DateTime, Utc};
use rek_types::{
    ActionType, AuditSeq, ComponentId, DocumentId, DocumentKind, LocationId, StockKey, SupplierId,
};
use serde::{Deserialize, Serialize};

/// Largest on-hand quantity a row may hold. Deltas are signed, so every
/// quantity must also fit in an `i64`.
pub const MAX_ON_HAND: u64 = i64::MAX as u64;

/// Current quantity of one component at one location.
///
/// `version` increases by one with every committed change to the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub component: ComponentId,
    pub location: LocationId,
    /// Quantity physically present. Never above [`MAX_ON_HAND`].
    pub on_hand: u64,
    /// Reorder point; informational only, never enforced.
    pub minimum_threshold: u64,
    pub version: u64,
    /// Time of the last committed change.
    pub updated_at: DateTime<Utc>,
}

impl StockRow {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.component, self.location)
    }

    pub fn is_below_minimum(&self) -> bool {
        self.on_hand < self.minimum_threshold
    }
}

/// Lifecycle status of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Draft)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        })
    }
}

/// One line of a receipt or issue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub component: ComponentId,
    pub location: LocationId,
    /// Units received or issued, always positive.
    pub quantity: u64,
    /// Purchase price per unit, recorded on receipts only.
    pub unit_price: Option<f64>,
}

impl LineItem {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.component, self.location)
    }
}

/// One counted line of an inventory act.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub component: ComponentId,
    pub location: LocationId,
    /// On-hand quantity before the count was applied.
    pub recorded_quantity: u64,
    pub counted_quantity: u64,
    /// `counted_quantity - recorded_quantity`.
    pub discrepancy: i64,
}

impl InventoryLine {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.component, self.location)
    }
}

/// Lines owned by a document. The variant always matches the document kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLines {
    Movement(Vec<LineItem>),
    Inventory(Vec<InventoryLine>),
}

impl DocumentLines {
    pub fn len(&self) -> usize {
        match self {
            Self::Movement(lines) => lines.len(),
            Self::Inventory(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A receipt, issue or inventory act.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Surrogate id, assigned in creation order.
    pub id: DocumentId,
    /// Business number, unique across all kinds.
    pub number: String,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    /// Delivering supplier; set on receipts only.
    pub supplier: Option<SupplierId>,
    /// Supplier invoice the receipt was booked against.
    pub invoice_number: Option<String>,
    /// Receiving department of an issue.
    pub department: Option<String>,
    /// Person who asked for the issue.
    pub requester: Option<String>,
    /// What the issued parts are for.
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// When the document left `Draft`.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who confirmed or cancelled it.
    pub closed_by: Option<String>,
    /// Ordered lines, owned by this document alone.
    pub lines: DocumentLines,
}

impl Document {
    /// Stock rows this document touches, sorted and deduplicated.
    pub fn keys(&self) -> Vec<StockKey> {
        let mut keys: Vec<StockKey> = match &self.lines {
            DocumentLines::Movement(lines) => lines.iter().map(LineItem::key).collect(),
            DocumentLines::Inventory(lines) => lines.iter().map(InventoryLine::key).collect(),
        };
        keys.sort();
        keys.dedup();
        keys
    }

    /// Borrow this document as a draft, the only state that accepts transitions.
    pub fn as_draft(&mut self) -> Option<Draft<'_>> {
        (self.status == DocumentStatus::Draft).then_some(Draft { document: self })
    }
}

/// A document known to be in `Draft` status.
///
/// `confirm` and `cancel` exist only here, so a terminal document has no
/// transition to call.
pub struct Draft<'a> {
    document: &'a mut Document,
}

impl Draft<'_> {
    pub fn document(&self) -> &Document {
        &*self.document
    }

    pub fn confirm(self, by: &str, at: DateTime<Utc>) {
        self.close(DocumentStatus::Confirmed, by, at);
    }

    pub fn cancel(self, by: &str, at: DateTime<Utc>) {
        self.close(DocumentStatus::Cancelled, by, at);
    }

    fn close(self, status: DocumentStatus, by: &str, at: DateTime<Utc>) {
        self.document.status = status;
        self.document.closed_at = Some(at);
        self.document.closed_by = Some(by.to_string());
    }
}

/// One immutable record of a quantity change or catalog event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, contiguous from 1.
    pub seq: AuditSeq,
    /// Commit time of the operation that wrote the entry.
    pub timestamp: DateTime<Utc>,
    pub action: ActionType,
    pub component: ComponentId,
    /// Stock row location; `None` for catalog events.
    pub location: Option<LocationId>,
    /// Signed change to on-hand; zero for catalog events.
    pub quantity_delta: i64,
    /// On-hand quantity right after the delta; `None` for catalog events.
    pub resulting_quantity: Option<u64>,
    pub performed_by: String,
    /// Receipt, issue or inventory act behind the change, if any.
    pub document: Option<DocumentId>,
    /// Free text such as an adjust reason or `receipt RCP-001`.
    pub description: Option<String>,
    /// `entry_hash` of the previous entry, zeros for the first.
    #[serde(with = "hex32")]
    pub prev_hash: [u8; 32],
    /// BLAKE3 over this entry with `entry_hash` zeroed.
    #[serde(with = "hex32")]
    pub entry_hash: [u8; 32],
}

impl AuditEntry {
    pub fn key(&self) -> Option<StockKey> {
        self.location.map(|l| StockKey::new(self.component, l))
    }

    /// Quantity before the delta was applied.
    pub fn quantity_before(&self) -> Option<u64> {
        self.resulting_quantity
            .map(|after| (after as i64 - self.quantity_delta) as u64)
    }
}

/// An audit entry before it is assigned a sequence number and hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditDraft {
    pub action: ActionType,
    pub component: ComponentId,
    pub location: Option<LocationId>,
    pub quantity_delta: i64,
    pub resulting_quantity: Option<u64>,
    pub document: Option<DocumentId>,
    pub description: Option<String>,
}

/// Input line for a receipt or issue draft. Quantities are validated, not typed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    pub component: ComponentId,
    pub location: Option<LocationId>,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// Input for `create_draft`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub number: String,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_by: String,
    pub lines: Vec<NewLine>,
}

impl NewDocument {
    pub fn receipt(number: &str, supplier: SupplierId, created_by: &str) -> Self {
        Self::empty(DocumentKind::Receipt, number, Some(supplier), created_by)
    }

    pub fn issue(number: &str, created_by: &str) -> Self {
        Self::empty(DocumentKind::Issue, number, None, created_by)
    }

    /// Append a line; builder style for tests and seeding.
    pub fn line(mut self, component: ComponentId, location: LocationId, quantity: i64) -> Self {
        self.lines.push(NewLine {
            component,
            location: Some(location),
            quantity,
            unit_price: None,
        });
        self
    }

    fn empty(
        kind: DocumentKind,
        number: &str,
        supplier: Option<SupplierId>,
        created_by: &str,
    ) -> Self {
        Self {
            kind,
            number: number.to_string(),
            supplier,
            invoice_number: None,
            department: None,
            requester: None,
            purpose: None,
            notes: None,
            created_by: created_by.to_string(),
            lines: Vec::new(),
        }
    }
}

/// Physical count of one stock row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    pub component: ComponentId,
    pub location: Option<LocationId>,
    pub counted_quantity: i64,
}

/// Input for `apply_inventory`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventory {
    pub number: String,
    pub created_by: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<InventoryCount>,
}

impl NewInventory {
    pub fn new(number: &str, created_by: &str) -> Self {
        Self {
            number: number.to_string(),
            created_by: created_by.to_string(),
            notes: None,
            lines: Vec::new(),
        }
    }

    pub fn count(mut self, component: ComponentId, location: LocationId, counted: i64) -> Self {
        self.lines.push(InventoryCount {
            component,
            location: Some(location),
            counted_quantity: counted,
        });
        self
    }
}

/// Input for a manual stock correction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub component: ComponentId,
    pub location: LocationId,
    pub new_quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    pub performed_by: String,
}

/// Result of confirming a document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Confirmation {
    pub document: Document,
    pub rows: Vec<StockRow>,
    pub entries: Vec<AuditEntry>,
}

/// Result of applying an inventory act.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryOutcome {
    pub document: Document,
    /// Rows created or changed by the act.
    pub rows: Vec<StockRow>,
    /// One entry per discrepancy.
    pub entries: Vec<AuditEntry>,
}

/// Serde helper storing 32-byte hashes as hex strings.
mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_document() -> Document {
        Document {
            id: DocumentId(1),
            number: "RCP-001".into(),
            kind: DocumentKind::Receipt,
            status: DocumentStatus::Draft,
            supplier: Some(SupplierId(1)),
            invoice_number: None,
            department: None,
            requester: None,
            purpose: None,
            notes: None,
            created_by: "storekeeper".into(),
            created_at: Utc::now(),
            closed_at: None,
            closed_by: None,
            lines: DocumentLines::Movement(vec![
                LineItem {
                    component: ComponentId(2),
                    location: LocationId(1),
                    quantity: 10,
                    unit_price: None,
                },
                LineItem {
                    component: ComponentId(1),
                    location: LocationId(1),
                    quantity: 5,
                    unit_price: Some(0.15),
                },
                LineItem {
                    component: ComponentId(1),
                    location: LocationId(1),
                    quantity: 7,
                    unit_price: None,
                },
            ]),
        }
    }

    #[test]
    fn draft_handle_only_for_drafts() {
        let mut doc = draft_document();
        let draft = doc.as_draft().unwrap();
        draft.confirm("clerk", Utc::now());
        assert_eq!(doc.status, DocumentStatus::Confirmed);
        assert_eq!(doc.closed_by.as_deref(), Some("clerk"));
        assert!(doc.as_draft().is_none());
    }

    #[test]
    fn cancel_is_terminal() {
        let mut doc = draft_document();
        doc.as_draft().unwrap().cancel("clerk", Utc::now());
        assert_eq!(doc.status, DocumentStatus::Cancelled);
        assert!(doc.status.is_terminal());
        assert!(doc.as_draft().is_none());
    }

    #[test]
    fn keys_are_sorted_and_unique() {
        let doc = draft_document();
        assert_eq!(
            doc.keys(),
            vec![
                StockKey::new(ComponentId(1), LocationId(1)),
                StockKey::new(ComponentId(2), LocationId(1)),
            ]
        );
    }

    #[test]
    fn quantity_before_is_derived() {
        let entry = AuditEntry {
            seq: AuditSeq(1),
            timestamp: Utc::now(),
            action: ActionType::Issue,
            component: ComponentId(1),
            location: Some(LocationId(1)),
            quantity_delta: -30,
            resulting_quantity: Some(20),
            performed_by: "clerk".into(),
            document: Some(DocumentId(4)),
            description: None,
            prev_hash: [0; 32],
            entry_hash: [1; 32],
        };
        assert_eq!(entry.quantity_before(), Some(50));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entry_hash"], hex::encode([1u8; 32]));
        let back: AuditEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn builders_fill_lines() {
        let doc = NewDocument::issue("ISS-1", "clerk")
            .line(ComponentId(1), LocationId(2), 30)
            .line(ComponentId(2), LocationId(2), 5);
        assert_eq!(doc.kind, DocumentKind::Issue);
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].location, Some(LocationId(2)));

        let inv = NewInventory::new("INV-1", "auditor").count(ComponentId(1), LocationId(1), 0);
        assert_eq!(inv.lines[0].counted_quantity, 0);
    }
}
