//! Reference data for the rek stock ledger.
//!
//! This crate provides:
//! - Catalog entities: categories, manufacturers, suppliers, storage
//!   locations and components
//! - A [`Catalog`] store with soft deactivation and atomic JSON persistence
//! - The [`rek_ledger::ReferenceData`] implementation the ledger validates against
//! - Demo seed data for a fresh warehouse

pub mod catalog;
pub mod error;
pub mod model;
pub mod seed;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use model::{
    Category, Component, ComponentPatch, ComponentQuery, Location, Manufacturer, NewCategory,
    NewComponent, NewLocation, NewManufacturer, NewSupplier, Supplier, SupplierPatch,
    DEFAULT_UNIT,
};
pub use seed::OpeningStock;
