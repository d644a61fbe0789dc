use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ComponentId, LocationId};

/// Identity of a stock row: one component stored at one location.
///
/// Ordering is component first, then location. Multi-row operations lock
/// rows in this order, so the derive must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub component: ComponentId,
    pub location: LocationId,
}

impl StockKey {
    pub const fn new(component: ComponentId, location: LocationId) -> Self {
        Self {
            component,
            location,
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.component, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_component_then_location() {
        let a = StockKey::new(ComponentId(1), LocationId(9));
        let b = StockKey::new(ComponentId(2), LocationId(1));
        let c = StockKey::new(ComponentId(2), LocationId(3));
        let mut keys = vec![c, a, b];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn display() {
        let key = StockKey::new(ComponentId(1), LocationId(2));
        assert_eq!(key.to_string(), "cmp:1@loc:2");
    }
}
