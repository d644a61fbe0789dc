//! Fixed reference data for tests, demos and embedding without a catalog.

use std::collections::{HashMap, HashSet};

use rek_types::{ComponentId, LocationId, SupplierId};

use crate::traits::ReferenceData;

/// A [`ReferenceData`] built from explicit id sets.
#[derive(Clone, Debug, Default)]
pub struct StaticReferenceData {
    components: HashMap<ComponentId, u64>,
    locations: HashSet<LocationId>,
    suppliers: HashSet<SupplierId>,
}

impl StaticReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Components `1..=components`, locations `1..=locations`, suppliers
    /// `1..=suppliers`, all with a zero minimum.
    pub fn with_ranges(components: u64, locations: u64, suppliers: u64) -> Self {
        Self {
            components: (1..=components).map(|c| (ComponentId(c), 0)).collect(),
            locations: (1..=locations).map(LocationId).collect(),
            suppliers: (1..=suppliers).map(SupplierId).collect(),
        }
    }

    pub fn component(mut self, id: ComponentId, minimum_stock: u64) -> Self {
        self.components.insert(id, minimum_stock);
        self
    }

    pub fn location(mut self, id: LocationId) -> Self {
        self.locations.insert(id);
        self
    }

    pub fn supplier(mut self, id: SupplierId) -> Self {
        self.suppliers.insert(id);
        self
    }
}

impl ReferenceData for StaticReferenceData {
    fn component_exists(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    fn location_exists(&self, id: LocationId) -> bool {
        self.locations.contains(&id)
    }

    fn supplier_exists(&self, id: SupplierId) -> bool {
        self.suppliers.contains(&id)
    }

    fn minimum_stock(&self, id: ComponentId) -> u64 {
        self.components.get(&id).copied().unwrap_or(0)
    }
}
