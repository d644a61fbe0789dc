use std::sync::Arc;

use rek_catalog::{Catalog, OpeningStock};
use rek_ledger::{Confirmation, LedgerEngine, NewDocument, NewLine, ReferenceData};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Number of the receipt that books seeded opening stock.
pub const OPENING_RECEIPT: &str = "OPENING-STOCK";

/// Shared handles every request works against.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Open (or create) the warehouse under `config.data_dir`.
    ///
    /// With `seed_catalog` set and an empty catalog, the demo data is loaded
    /// and its opening stock booked as one confirmed receipt.
    pub fn open(config: &ServerConfig) -> ServerResult<Self> {
        let catalog = Arc::new(Catalog::open(config.catalog_path())?);
        let opening = if config.seed_catalog {
            catalog.seed()?
        } else {
            None
        };

        let reference: Arc<dyn ReferenceData> = catalog.clone();
        let engine = Arc::new(LedgerEngine::open(
            &config.ledger_dir(),
            reference,
            config.engine_config(),
        )?);

        let state = Self { engine, catalog };
        if let Some(opening) = opening {
            state.book_opening_stock(&opening)?;
        }
        Ok(state)
    }

    /// Book seeded balances through the ledger so the audit log explains them.
    pub fn book_opening_stock(&self, opening: &[OpeningStock]) -> ServerResult<Option<Confirmation>> {
        if opening.is_empty() || self.engine.find_document(OPENING_RECEIPT).is_some() {
            return Ok(None);
        }
        let supplier = self
            .catalog
            .suppliers(true)
            .first()
            .map(|s| s.id)
            .ok_or_else(|| ServerError::Internal("no active supplier for opening stock".into()))?;

        let mut receipt = NewDocument::receipt(OPENING_RECEIPT, supplier, "system");
        receipt.notes = Some("opening balance".into());
        receipt.lines = opening
            .iter()
            .map(|o| NewLine {
                component: o.component,
                location: Some(o.location),
                quantity: o.quantity as i64,
                unit_price: None,
            })
            .collect();

        let draft = self.engine.create_draft(receipt)?;
        let confirmation = self.engine.confirm(draft.id, "system")?;
        info!(lines = opening.len(), "opening stock booked");
        Ok(Some(confirmation))
    }
}
