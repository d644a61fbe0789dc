//! Catalog entities and the inputs that create or change them.

use chrono::{DateTime, Utc};
use rek_types::{CategoryId, ComponentId, LocationId, ManufacturerId, SupplierId};
use serde::{Deserialize, Serialize};

/// Unit of measure given to components created without one.
pub const DEFAULT_UNIT: &str = "pcs";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Short unique code, e.g. `CAP`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
    pub country: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Taxpayer identification number.
    pub inn: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A storage cell: rack, shelf number and cell number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    /// Unique display code, e.g. `A1-03`.
    pub code: String,
    pub rack: String,
    pub shelf: u32,
    pub cell: u32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    /// Manufacturer part number, unique in the catalog.
    pub part_number: String,
    pub name: String,
    pub category: CategoryId,
    pub manufacturer: Option<ManufacturerId>,
    pub description: Option<String>,
    pub unit: String,
    /// Package / footprint, e.g. `0402` or `SOT-23`.
    pub package: Option<String>,
    /// Reorder level summed over all locations.
    pub min_stock: u64,
    pub unit_price: Option<f64>,
    pub datasheet_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewManufacturer {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub inn: Option<String>,
}

/// Partial update of a supplier; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub inn: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub code: String,
    pub rack: String,
    pub shelf: u32,
    pub cell: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewComponent {
    pub part_number: String,
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub manufacturer: Option<ManufacturerId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub min_stock: u64,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub datasheet_url: Option<String>,
}

/// Partial update of a component; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub package: Option<String>,
    pub min_stock: Option<u64>,
    pub unit_price: Option<f64>,
    pub datasheet_url: Option<String>,
    pub is_active: Option<bool>,
}

impl ComponentPatch {
    /// Names of the fields this patch sets, for audit descriptions.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("name", self.name.is_some()),
            ("description", self.description.is_some()),
            ("package", self.package.is_some()),
            ("min_stock", self.min_stock.is_some()),
            ("unit_price", self.unit_price.is_some()),
            ("datasheet_url", self.datasheet_url.is_some()),
            ("is_active", self.is_active.is_some()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

/// Filter for listing components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentQuery {
    pub category: Option<CategoryId>,
    pub manufacturer: Option<ManufacturerId>,
    /// Case-insensitive substring of the name or part number.
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl ComponentQuery {
    pub fn matches(&self, component: &Component) -> bool {
        if !self.include_inactive && !component.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != component.category) {
            return false;
        }
        if self
            .manufacturer
            .is_some_and(|m| component.manufacturer != Some(m))
        {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                component.name.to_lowercase().contains(&needle)
                    || component.part_number.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}
