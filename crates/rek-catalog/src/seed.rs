//! Demo reference data for a fresh warehouse.

use rek_types::{CategoryId, ComponentId, LocationId, ManufacturerId};
use tracing::info;

use crate::catalog::{Catalog, CatalogData};
use crate::error::{CatalogError, Result};
use crate::model::{NewCategory, NewComponent, NewLocation, NewManufacturer, NewSupplier};

const CATEGORIES: [(&str, &str, &str); 8] = [
    ("RES", "Resistors", "Fixed resistors"),
    ("CAP", "Capacitors", "Capacitive components"),
    ("IND", "Inductors", "Coils and chokes"),
    ("DIO", "Diodes", "Semiconductor diodes"),
    ("TR", "Transistors", "Bipolar and field-effect"),
    ("IC", "Integrated circuits", "Integrated circuits"),
    ("CON", "Connectors", "Connectors and headers"),
    ("XTAL", "Crystals", "Quartz resonators"),
];

const MANUFACTURERS: [(&str, &str, Option<&str>); 6] = [
    ("Yageo", "Taiwan", Some("https://yageo.com")),
    ("Murata", "Japan", Some("https://murata.com")),
    ("Samsung Electro", "South Korea", None),
    ("Texas Instruments", "USA", Some("https://ti.com")),
    ("STMicroelectronics", "Switzerland", Some("https://st.com")),
    ("Vishay", "USA", None),
];

struct SeedSupplier {
    name: &'static str,
    contact: &'static str,
    phone: &'static str,
    email: Option<&'static str>,
    inn: &'static str,
}

const SUPPLIERS: [SeedSupplier; 3] = [
    SeedSupplier {
        name: "ChipDip LLC",
        contact: "A. A. Ivanov",
        phone: "+7-495-100-10-10",
        email: Some("order@chipdip.ru"),
        inn: "7701234567",
    },
    SeedSupplier {
        name: "Compel JSC",
        contact: "E. V. Petrova",
        phone: "+7-495-200-20-20",
        email: Some("sales@compel.ru"),
        inn: "7701234568",
    },
    SeedSupplier {
        name: "RadioElement LLC",
        contact: "K. P. Sidorov",
        phone: "+7-812-300-30-30",
        email: None,
        inn: "7801234569",
    },
];

struct SeedComponent {
    part_number: &'static str,
    name: &'static str,
    category: &'static str,
    manufacturer: &'static str,
    package: &'static str,
    min_stock: u64,
    unit_price: f64,
    opening: u64,
}

const COMPONENTS: [SeedComponent; 9] = [
    SeedComponent {
        part_number: "RC0402FR-0710KL",
        name: "Resistor 10k 1% 0402",
        category: "RES",
        manufacturer: "Yageo",
        package: "0402",
        min_stock: 1000,
        unit_price: 0.15,
        opening: 5000,
    },
    SeedComponent {
        part_number: "RC0402FR-07100RL",
        name: "Resistor 100R 1% 0402",
        category: "RES",
        manufacturer: "Yageo",
        package: "0402",
        min_stock: 500,
        unit_price: 0.15,
        opening: 3000,
    },
    SeedComponent {
        part_number: "GRM155R61A105KE15D",
        name: "Capacitor 1uF 10V X5R 0402",
        category: "CAP",
        manufacturer: "Murata",
        package: "0402",
        min_stock: 2000,
        unit_price: 1.20,
        opening: 8000,
    },
    SeedComponent {
        part_number: "CL10A475KQ8NNNC",
        name: "Capacitor 4.7uF 16V X5R 0603",
        category: "CAP",
        manufacturer: "Samsung Electro",
        package: "0603",
        min_stock: 500,
        unit_price: 1.80,
        opening: 2500,
    },
    SeedComponent {
        part_number: "LQH31PN100M23L",
        name: "Inductor 10uH 500mA 1210",
        category: "IND",
        manufacturer: "Murata",
        package: "1210",
        min_stock: 200,
        unit_price: 8.50,
        opening: 400,
    },
    SeedComponent {
        part_number: "BAV99",
        name: "Dual diode BAV99 SOT-23",
        category: "DIO",
        manufacturer: "Vishay",
        package: "SOT-23",
        min_stock: 300,
        unit_price: 2.50,
        opening: 650,
    },
    SeedComponent {
        part_number: "MMBT3904",
        name: "NPN transistor MMBT3904 SOT-23",
        category: "TR",
        manufacturer: "Vishay",
        package: "SOT-23",
        min_stock: 200,
        unit_price: 3.00,
        opening: 480,
    },
    SeedComponent {
        part_number: "STM32F103C8T6",
        name: "MCU STM32F103C8T6 LQFP-48",
        category: "IC",
        manufacturer: "STMicroelectronics",
        package: "LQFP-48",
        min_stock: 10,
        unit_price: 350.00,
        opening: 25,
    },
    SeedComponent {
        part_number: "TLV1117-33",
        name: "Regulator 3.3V 800mA SOT-223",
        category: "IC",
        manufacturer: "Texas Instruments",
        package: "SOT-223",
        min_stock: 50,
        unit_price: 45.00,
        opening: 120,
    },
];

/// Opening balance of one seeded component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpeningStock {
    pub component: ComponentId,
    pub location: LocationId,
    pub quantity: u64,
}

impl Catalog {
    /// Fill an empty catalog with the demo warehouse: eight categories, six
    /// manufacturers, three suppliers, storage cells `A1-01` to `C3-05` and
    /// nine components.
    ///
    /// Returns the opening balances for the caller to book through the
    /// ledger, one component per cell starting at `A1-01`. Returns `None`
    /// and changes nothing if the catalog already has data.
    pub fn seed(&self) -> Result<Option<Vec<OpeningStock>>> {
        if !self.is_empty() {
            return Ok(None);
        }
        let opening = self.mutate(seed_into)?;
        info!(components = opening.len(), "catalog seeded");
        Ok(Some(opening))
    }
}

fn seed_into(data: &mut CatalogData) -> Result<Vec<OpeningStock>> {
    let mut categories: Vec<(&str, CategoryId)> = Vec::new();
    for (code, name, description) in CATEGORIES {
        let category = data.add_category(NewCategory {
            code: code.into(),
            name: name.into(),
            description: Some(description.into()),
        })?;
        categories.push((code, category.id));
    }

    let mut manufacturers: Vec<(&str, ManufacturerId)> = Vec::new();
    for (name, country, website) in MANUFACTURERS {
        let manufacturer = data.add_manufacturer(NewManufacturer {
            name: name.into(),
            country: Some(country.into()),
            website: website.map(Into::into),
        })?;
        manufacturers.push((name, manufacturer.id));
    }

    for supplier in &SUPPLIERS {
        data.add_supplier(NewSupplier {
            name: supplier.name.into(),
            contact_name: Some(supplier.contact.into()),
            phone: Some(supplier.phone.into()),
            email: supplier.email.map(Into::into),
            address: None,
            inn: Some(supplier.inn.into()),
        })?;
    }

    let mut locations = Vec::new();
    for rack in ['A', 'B', 'C'] {
        for shelf in 1..=3u32 {
            for cell in 1..=5u32 {
                let location = data.add_location(NewLocation {
                    code: format!("{rack}{shelf}-{cell:02}"),
                    rack: format!("{rack}{shelf}"),
                    shelf,
                    cell,
                    description: None,
                })?;
                locations.push(location.id);
            }
        }
    }

    let mut opening = Vec::with_capacity(COMPONENTS.len());
    for (seed, location) in COMPONENTS.iter().zip(locations) {
        let category = categories
            .iter()
            .find(|(code, _)| *code == seed.category)
            .map(|(_, id)| *id)
            .ok_or_else(|| {
                CatalogError::Validation(format!("unknown seed category {}", seed.category))
            })?;
        let manufacturer = manufacturers
            .iter()
            .find(|(name, _)| *name == seed.manufacturer)
            .map(|(_, id)| *id);
        let component = data.add_component(NewComponent {
            part_number: seed.part_number.into(),
            name: seed.name.into(),
            category,
            manufacturer,
            description: None,
            unit: None,
            package: Some(seed.package.into()),
            min_stock: seed.min_stock,
            unit_price: Some(seed.unit_price),
            datasheet_url: None,
        })?;
        opening.push(OpeningStock {
            component: component.id,
            location,
            quantity: seed.opening,
        });
    }
    Ok(opening)
}
