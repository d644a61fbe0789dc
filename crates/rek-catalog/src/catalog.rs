use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use rek_ledger::ReferenceData;
use rek_types::{CategoryId, ComponentId, LocationId, ManufacturerId, SupplierId};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::{CatalogError, Result};
use crate::model::*;

/// Everything the catalog holds, as stored on disk. Each list is in id order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CatalogData {
    pub categories: Vec<Category>,
    pub manufacturers: Vec<Manufacturer>,
    pub suppliers: Vec<Supplier>,
    pub locations: Vec<Location>,
    pub components: Vec<Component>,
}

/// Reference data: categories, manufacturers, suppliers, storage locations
/// and components.
///
/// Reads share a lock. Every mutation builds the next state on a copy, saves
/// it (when file-backed) and only then swaps it in, so a failed save leaves
/// the catalog unchanged.
pub struct Catalog {
    path: Option<PathBuf>,
    data: RwLock<CatalogData>,
}

impl Catalog {
    /// A catalog that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(CatalogData::default()),
        }
    }

    /// Load the catalog stored at `path`, or start an empty one there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read(&path)?;
            serde_json::from_slice(&raw).map_err(|e| CatalogError::Serialization(e.to_string()))?
        } else {
            CatalogData::default()
        };
        info!(
            path = %path.display(),
            components = data.components.len(),
            locations = data.locations.len(),
            "catalog loaded"
        );
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when nothing at all has been defined yet.
    pub fn is_empty(&self) -> bool {
        let data = self.data.read();
        data.categories.is_empty()
            && data.manufacturers.is_empty()
            && data.suppliers.is_empty()
            && data.locations.is_empty()
            && data.components.is_empty()
    }

    pub(crate) fn mutate<T>(&self, change: impl FnOnce(&mut CatalogData) -> Result<T>) -> Result<T> {
        self.mutate_recorded(change, |_| Ok::<(), CatalogError>(()))
    }

    /// Like [`Catalog::mutate`], but `record` sees the validated result
    /// before anything is saved. If `record` fails the catalog is unchanged.
    fn mutate_recorded<T, E>(
        &self,
        change: impl FnOnce(&mut CatalogData) -> Result<T>,
        record: impl FnOnce(&T) -> std::result::Result<(), E>,
    ) -> std::result::Result<T, E>
    where
        E: From<CatalogError>,
    {
        let mut data = self.data.write();
        let mut next = data.clone();
        let out = change(&mut next)?;
        record(&out)?;
        if let Err(e) = self.save(&next) {
            error!(error = %e, "catalog save failed after the change was recorded");
            return Err(e.into());
        }
        *data = next;
        Ok(out)
    }

    fn save(&self, data: &CatalogData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(file.as_file());
            serde_json::to_writer_pretty(&mut writer, data)
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| CatalogError::Io(e.error))?;
        debug!(path = %path.display(), "catalog saved");
        Ok(())
    }

    // ── categories ──────────────────────────────────────────────────────

    pub fn create_category(&self, new: NewCategory) -> Result<Category> {
        let category = self.mutate(|data| data.add_category(new))?;
        info!(id = %category.id, code = %category.code, "category created");
        Ok(category)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.data.read().categories.clone()
    }

    pub fn category(&self, id: CategoryId) -> Result<Category> {
        self.data
            .read()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "category",
                id: id.get(),
            })
    }

    /// Remove a category that no component uses.
    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        self.mutate(|data| {
            if data.components.iter().any(|c| c.category == id) {
                return Err(CatalogError::InUse {
                    kind: "category",
                    id: id.get(),
                });
            }
            let before = data.categories.len();
            data.categories.retain(|c| c.id != id);
            if data.categories.len() == before {
                return Err(CatalogError::NotFound {
                    kind: "category",
                    id: id.get(),
                });
            }
            Ok(())
        })?;
        info!(%id, "category deleted");
        Ok(())
    }

    // ── manufacturers ───────────────────────────────────────────────────

    pub fn create_manufacturer(&self, new: NewManufacturer) -> Result<Manufacturer> {
        let manufacturer = self.mutate(|data| data.add_manufacturer(new))?;
        info!(id = %manufacturer.id, name = %manufacturer.name, "manufacturer created");
        Ok(manufacturer)
    }

    pub fn manufacturers(&self) -> Vec<Manufacturer> {
        self.data.read().manufacturers.clone()
    }

    pub fn manufacturer(&self, id: ManufacturerId) -> Result<Manufacturer> {
        self.data
            .read()
            .manufacturers
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "manufacturer",
                id: id.get(),
            })
    }

    // ── suppliers ───────────────────────────────────────────────────────

    pub fn create_supplier(&self, new: NewSupplier) -> Result<Supplier> {
        let supplier = self.mutate(|data| data.add_supplier(new))?;
        info!(id = %supplier.id, name = %supplier.name, "supplier created");
        Ok(supplier)
    }

    pub fn suppliers(&self, active_only: bool) -> Vec<Supplier> {
        self.data
            .read()
            .suppliers
            .iter()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect()
    }

    pub fn supplier(&self, id: SupplierId) -> Result<Supplier> {
        self.data
            .read()
            .suppliers
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "supplier",
                id: id.get(),
            })
    }

    pub fn update_supplier(&self, id: SupplierId, patch: SupplierPatch) -> Result<Supplier> {
        let supplier = self.mutate(|data| {
            let supplier = data.supplier_mut(id)?;
            if let Some(name) = patch.name {
                supplier.name = required("supplier name", &name)?;
            }
            if patch.contact_name.is_some() {
                supplier.contact_name = patch.contact_name;
            }
            if patch.phone.is_some() {
                supplier.phone = patch.phone;
            }
            if patch.email.is_some() {
                supplier.email = patch.email;
            }
            if patch.address.is_some() {
                supplier.address = patch.address;
            }
            if patch.inn.is_some() {
                supplier.inn = patch.inn;
            }
            if let Some(active) = patch.is_active {
                supplier.is_active = active;
            }
            Ok(supplier.clone())
        })?;
        info!(%id, "supplier updated");
        Ok(supplier)
    }

    /// Soft delete: the supplier stays for history but takes no new receipts.
    pub fn deactivate_supplier(&self, id: SupplierId) -> Result<Supplier> {
        let supplier = self.mutate(|data| {
            let supplier = data.supplier_mut(id)?;
            supplier.is_active = false;
            Ok(supplier.clone())
        })?;
        info!(%id, "supplier deactivated");
        Ok(supplier)
    }

    // ── locations ───────────────────────────────────────────────────────

    pub fn create_location(&self, new: NewLocation) -> Result<Location> {
        let location = self.mutate(|data| data.add_location(new))?;
        info!(id = %location.id, code = %location.code, "location created");
        Ok(location)
    }

    pub fn locations(&self, active_only: bool) -> Vec<Location> {
        self.data
            .read()
            .locations
            .iter()
            .filter(|l| !active_only || l.is_active)
            .cloned()
            .collect()
    }

    pub fn location(&self, id: LocationId) -> Result<Location> {
        self.data
            .read()
            .locations
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "location",
                id: id.get(),
            })
    }

    pub fn find_location(&self, code: &str) -> Option<Location> {
        self.data
            .read()
            .locations
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .cloned()
    }

    // ── components ──────────────────────────────────────────────────────

    pub fn create_component(&self, new: NewComponent) -> Result<Component> {
        self.create_component_recorded(new, |_| Ok::<(), CatalogError>(()))
    }

    /// Create a component, handing it to `record` before the catalog is
    /// saved. The component exists only if `record` succeeds.
    pub fn create_component_recorded<E: From<CatalogError>>(
        &self,
        new: NewComponent,
        record: impl FnOnce(&Component) -> std::result::Result<(), E>,
    ) -> std::result::Result<Component, E> {
        let component = self.mutate_recorded(|data| data.add_component(new), record)?;
        info!(
            id = %component.id,
            part_number = %component.part_number,
            "component created"
        );
        Ok(component)
    }

    pub fn components(&self, query: &ComponentQuery) -> Vec<Component> {
        self.data
            .read()
            .components
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect()
    }

    pub fn component(&self, id: ComponentId) -> Result<Component> {
        self.data
            .read()
            .components
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "component",
                id: id.get(),
            })
    }

    pub fn find_component(&self, part_number: &str) -> Option<Component> {
        self.data
            .read()
            .components
            .iter()
            .find(|c| c.part_number.eq_ignore_ascii_case(part_number))
            .cloned()
    }

    pub fn update_component(&self, id: ComponentId, patch: ComponentPatch) -> Result<Component> {
        self.update_component_recorded(id, patch, |_| Ok::<(), CatalogError>(()))
    }

    /// Update a component, handing the patched value to `record` before the
    /// catalog is saved.
    pub fn update_component_recorded<E: From<CatalogError>>(
        &self,
        id: ComponentId,
        patch: ComponentPatch,
        record: impl FnOnce(&Component) -> std::result::Result<(), E>,
    ) -> std::result::Result<Component, E> {
        let component = self.mutate_recorded(
            |data| {
                let component = data.component_mut(id)?;
                if let Some(name) = patch.name {
                    component.name = required("component name", &name)?;
                }
                if patch.description.is_some() {
                    component.description = patch.description;
                }
                if patch.package.is_some() {
                    component.package = patch.package;
                }
                if let Some(min_stock) = patch.min_stock {
                    component.min_stock = min_stock;
                }
                if let Some(price) = patch.unit_price {
                    component.unit_price = Some(non_negative_price(price)?);
                }
                if patch.datasheet_url.is_some() {
                    component.datasheet_url = patch.datasheet_url;
                }
                if let Some(active) = patch.is_active {
                    component.is_active = active;
                }
                component.updated_at = Some(Utc::now());
                Ok(component.clone())
            },
            record,
        )?;
        info!(%id, "component updated");
        Ok(component)
    }

    /// Soft delete: history keeps the component, new documents cannot use it.
    pub fn deactivate_component(&self, id: ComponentId) -> Result<Component> {
        self.deactivate_component_recorded(id, |_| Ok::<(), CatalogError>(()))
    }

    pub fn deactivate_component_recorded<E: From<CatalogError>>(
        &self,
        id: ComponentId,
        record: impl FnOnce(&Component) -> std::result::Result<(), E>,
    ) -> std::result::Result<Component, E> {
        let component = self.mutate_recorded(
            |data| {
                let component = data.component_mut(id)?;
                component.is_active = false;
                component.updated_at = Some(Utc::now());
                Ok(component.clone())
            },
            record,
        )?;
        info!(%id, "component deactivated");
        Ok(component)
    }
}

impl ReferenceData for Catalog {
    fn component_exists(&self, id: ComponentId) -> bool {
        self.data
            .read()
            .components
            .iter()
            .any(|c| c.id == id && c.is_active)
    }

    fn location_exists(&self, id: LocationId) -> bool {
        self.data
            .read()
            .locations
            .iter()
            .any(|l| l.id == id && l.is_active)
    }

    fn supplier_exists(&self, id: SupplierId) -> bool {
        self.data
            .read()
            .suppliers
            .iter()
            .any(|s| s.id == id && s.is_active)
    }

    fn minimum_stock(&self, id: ComponentId) -> u64 {
        self.data
            .read()
            .components
            .iter()
            .find(|c| c.id == id)
            .map_or(0, |c| c.min_stock)
    }
}

impl CatalogData {
    pub(crate) fn add_category(&mut self, new: NewCategory) -> Result<Category> {
        let code = required("category code", &new.code)?;
        if self.categories.iter().any(|c| c.code.eq_ignore_ascii_case(&code)) {
            return Err(CatalogError::Duplicate {
                kind: "category",
                key: code,
            });
        }
        let category = Category {
            id: CategoryId(next_id(self.categories.iter().map(|c| c.id.get()))),
            code,
            name: required("category name", &new.name)?,
            description: new.description,
            created_at: Utc::now(),
        };
        self.categories.push(category.clone());
        Ok(category)
    }

    pub(crate) fn add_manufacturer(&mut self, new: NewManufacturer) -> Result<Manufacturer> {
        let manufacturer = Manufacturer {
            id: ManufacturerId(next_id(self.manufacturers.iter().map(|m| m.id.get()))),
            name: required("manufacturer name", &new.name)?,
            country: new.country,
            website: new.website,
            created_at: Utc::now(),
        };
        self.manufacturers.push(manufacturer.clone());
        Ok(manufacturer)
    }

    pub(crate) fn add_supplier(&mut self, new: NewSupplier) -> Result<Supplier> {
        let supplier = Supplier {
            id: SupplierId(next_id(self.suppliers.iter().map(|s| s.id.get()))),
            name: required("supplier name", &new.name)?,
            contact_name: new.contact_name,
            phone: new.phone,
            email: new.email,
            address: new.address,
            inn: new.inn,
            is_active: true,
            created_at: Utc::now(),
        };
        self.suppliers.push(supplier.clone());
        Ok(supplier)
    }

    pub(crate) fn add_location(&mut self, new: NewLocation) -> Result<Location> {
        let code = required("location code", &new.code)?;
        if new.shelf == 0 || new.cell == 0 {
            return Err(CatalogError::Validation(
                "shelf and cell numbers start at 1".into(),
            ));
        }
        if self.locations.iter().any(|l| l.code.eq_ignore_ascii_case(&code)) {
            return Err(CatalogError::Duplicate {
                kind: "location",
                key: code,
            });
        }
        let location = Location {
            id: LocationId(next_id(self.locations.iter().map(|l| l.id.get()))),
            code,
            rack: required("rack", &new.rack)?,
            shelf: new.shelf,
            cell: new.cell,
            description: new.description,
            is_active: true,
            created_at: Utc::now(),
        };
        self.locations.push(location.clone());
        Ok(location)
    }

    pub(crate) fn add_component(&mut self, new: NewComponent) -> Result<Component> {
        let part_number = required("part number", &new.part_number)?;
        if self
            .components
            .iter()
            .any(|c| c.part_number.eq_ignore_ascii_case(&part_number))
        {
            return Err(CatalogError::Duplicate {
                kind: "component",
                key: part_number,
            });
        }
        if !self.categories.iter().any(|c| c.id == new.category) {
            return Err(CatalogError::NotFound {
                kind: "category",
                id: new.category.get(),
            });
        }
        if let Some(manufacturer) = new.manufacturer {
            if !self.manufacturers.iter().any(|m| m.id == manufacturer) {
                return Err(CatalogError::NotFound {
                    kind: "manufacturer",
                    id: manufacturer.get(),
                });
            }
        }
        let unit_price = new.unit_price.map(non_negative_price).transpose()?;

        let component = Component {
            id: ComponentId(next_id(self.components.iter().map(|c| c.id.get()))),
            part_number,
            name: required("component name", &new.name)?,
            category: new.category,
            manufacturer: new.manufacturer,
            description: new.description,
            unit: new.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            package: new.package,
            min_stock: new.min_stock,
            unit_price,
            datasheet_url: new.datasheet_url,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.components.push(component.clone());
        Ok(component)
    }

    fn supplier_mut(&mut self, id: SupplierId) -> Result<&mut Supplier> {
        self.suppliers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CatalogError::NotFound {
                kind: "supplier",
                id: id.get(),
            })
    }

    fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component> {
        self.components
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CatalogError::NotFound {
                kind: "component",
                id: id.get(),
            })
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn non_negative_price(price: f64) -> Result<f64> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(CatalogError::Validation(format!(
            "unit price must be a non-negative number, got {price}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn category(catalog: &Catalog, code: &str) -> Category {
        catalog
            .create_category(NewCategory {
                code: code.into(),
                name: format!("{code} parts"),
                description: None,
            })
            .unwrap()
    }

    fn component(catalog: &Catalog, part: &str, name: &str, category: CategoryId) -> Component {
        catalog
            .create_component(NewComponent {
                part_number: part.into(),
                name: name.into(),
                category,
                manufacturer: None,
                description: None,
                unit: None,
                package: Some("0402".into()),
                min_stock: 100,
                unit_price: Some(0.15),
                datasheet_url: None,
            })
            .unwrap()
    }

    #[test]
    fn components_require_known_category_and_unique_part_number() {
        let catalog = Catalog::in_memory();
        let res = category(&catalog, "RES");
        let first = component(&catalog, "RC0402-10K", "Resistor 10k", res.id);
        assert_eq!(first.id, ComponentId(1));
        assert_eq!(first.unit, DEFAULT_UNIT);

        let mut dup = NewComponent {
            part_number: "rc0402-10k".into(),
            name: "Again".into(),
            category: res.id,
            manufacturer: None,
            description: None,
            unit: None,
            package: None,
            min_stock: 0,
            unit_price: None,
            datasheet_url: None,
        };
        assert!(matches!(
            catalog.create_component(dup.clone()),
            Err(CatalogError::Duplicate { .. })
        ));

        dup.part_number = "OTHER".into();
        dup.category = CategoryId(9);
        assert!(matches!(
            catalog.create_component(dup),
            Err(CatalogError::NotFound { kind: "category", .. })
        ));
    }

    #[test]
    fn search_and_filters() {
        let catalog = Catalog::in_memory();
        let res = category(&catalog, "RES");
        let cap = category(&catalog, "CAP");
        component(&catalog, "RC0402-10K", "Resistor 10k", res.id);
        let c2 = component(&catalog, "GRM155", "Capacitor 1uF", cap.id);
        component(&catalog, "RC0402-100R", "Resistor 100R", res.id);

        let found = catalog.components(&ComponentQuery {
            search: Some("rc0402".into()),
            ..Default::default()
        });
        assert_eq!(found.len(), 2);

        let caps = catalog.components(&ComponentQuery {
            category: Some(cap.id),
            ..Default::default()
        });
        assert_eq!(caps, vec![c2.clone()]);

        catalog.deactivate_component(c2.id).unwrap();
        assert!(catalog
            .components(&ComponentQuery {
                category: Some(cap.id),
                ..Default::default()
            })
            .is_empty());
        assert_eq!(
            catalog
                .components(&ComponentQuery {
                    include_inactive: true,
                    ..Default::default()
                })
                .len(),
            3
        );
        assert!(!catalog.component_exists(c2.id));
        assert_eq!(catalog.minimum_stock(c2.id), 100);
    }

    #[test]
    fn patch_changes_only_given_fields() {
        let catalog = Catalog::in_memory();
        let res = category(&catalog, "RES");
        let c = component(&catalog, "RC0402-10K", "Resistor 10k", res.id);

        let patch = ComponentPatch {
            min_stock: Some(2500),
            unit_price: Some(0.2),
            ..Default::default()
        };
        assert_eq!(patch.changed_fields(), vec!["min_stock", "unit_price"]);
        let updated = catalog.update_component(c.id, patch).unwrap();
        assert_eq!(updated.min_stock, 2500);
        assert_eq!(updated.name, "Resistor 10k");
        assert!(updated.updated_at.is_some());

        let bad = ComponentPatch {
            unit_price: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_component(c.id, bad),
            Err(CatalogError::Validation(_))
        ));
        assert_eq!(catalog.component(c.id).unwrap().unit_price, Some(0.2));
    }

    #[test]
    fn suppliers_soft_delete() {
        let catalog = Catalog::in_memory();
        let supplier = catalog
            .create_supplier(NewSupplier {
                name: "Parts Ltd".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(catalog.supplier_exists(supplier.id));

        catalog.deactivate_supplier(supplier.id).unwrap();
        assert!(!catalog.supplier_exists(supplier.id));
        assert!(catalog.suppliers(true).is_empty());
        assert_eq!(catalog.suppliers(false).len(), 1);

        let renamed = catalog
            .update_supplier(
                supplier.id,
                SupplierPatch {
                    name: Some("Parts Group".into()),
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Parts Group");
        assert!(catalog.supplier_exists(supplier.id));
    }

    #[test]
    fn category_in_use_cannot_be_deleted() {
        let catalog = Catalog::in_memory();
        let res = category(&catalog, "RES");
        let spare = category(&catalog, "XTAL");
        component(&catalog, "RC0402-10K", "Resistor 10k", res.id);

        assert!(matches!(
            catalog.delete_category(res.id),
            Err(CatalogError::InUse { .. })
        ));
        catalog.delete_category(spare.id).unwrap();
        assert_eq!(catalog.categories().len(), 1);
    }

    #[test]
    fn locations_validate_and_deduplicate() {
        let catalog = Catalog::in_memory();
        let new = NewLocation {
            code: "A1-01".into(),
            rack: "A1".into(),
            shelf: 1,
            cell: 1,
            description: None,
        };
        let loc = catalog.create_location(new.clone()).unwrap();
        assert!(matches!(
            catalog.create_location(new.clone()),
            Err(CatalogError::Duplicate { .. })
        ));
        assert!(matches!(
            catalog.create_location(NewLocation {
                code: "A1-02".into(),
                cell: 0,
                ..new
            }),
            Err(CatalogError::Validation(_))
        ));
        assert_eq!(catalog.find_location("a1-01").unwrap().id, loc.id);
    }

    #[test]
    fn file_backed_catalog_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        {
            let catalog = Catalog::open(&path).unwrap();
            assert!(catalog.is_empty());
            let res = category(&catalog, "RES");
            component(&catalog, "RC0402-10K", "Resistor 10k", res.id);
        }
        let catalog = Catalog::open(&path).unwrap();
        assert_eq!(catalog.categories().len(), 1);
        assert_eq!(
            catalog.find_component("RC0402-10K").unwrap().min_stock,
            100
        );
        let next = category(&catalog, "CAP");
        assert_eq!(next.id, CategoryId(2));
    }

    #[test]
    fn failed_record_leaves_component_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let catalog = Catalog::open(&path).unwrap();
        let res = category(&catalog, "RES");
        let resistor = component(&catalog, "RC0402-10K", "Resistor 10k", res.id);

        let refused = || Err(CatalogError::Validation("audit unavailable".into()));
        let patch = ComponentPatch {
            min_stock: Some(5),
            ..ComponentPatch::default()
        };
        assert!(catalog
            .update_component_recorded(resistor.id, patch, |_| refused())
            .is_err());
        assert!(catalog
            .deactivate_component_recorded(resistor.id, |_| refused())
            .is_err());
        let extra = NewComponent {
            part_number: "RC0402-1K".into(),
            name: "Resistor 1k".into(),
            category: res.id,
            manufacturer: None,
            description: None,
            unit: None,
            package: None,
            min_stock: 0,
            unit_price: None,
            datasheet_url: None,
        };
        assert!(catalog
            .create_component_recorded(extra, |_| refused())
            .is_err());

        let mut seen = None;
        let updated = catalog
            .update_component_recorded(
                resistor.id,
                ComponentPatch {
                    name: Some("Resistor 10k 1%".into()),
                    ..ComponentPatch::default()
                },
                |c| {
                    seen = Some(c.name.clone());
                    Ok::<(), CatalogError>(())
                },
            )
            .unwrap();
        assert_eq!(seen.as_deref(), Some("Resistor 10k 1%"));

        let reopened = Catalog::open(&path).unwrap();
        let stored = reopened.component(resistor.id).unwrap();
        assert_eq!(stored.min_stock, 100);
        assert!(stored.is_active);
        assert_eq!(stored.name, updated.name);
        assert!(reopened.find_component("RC0402-1K").is_none());
    }
}
