use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            /// Accepts both the bare number and the prefixed display form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix($prefix).unwrap_or(s);
                digits
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| TypeError::InvalidId(s.to_string()))
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

numeric_id!(
    /// Catalog identifier of an electronic component.
    ComponentId,
    "cmp:"
);
numeric_id!(
    /// Catalog identifier of a storage cell (rack / shelf / cell).
    LocationId,
    "loc:"
);
numeric_id!(
    /// Catalog identifier of a supplier.
    SupplierId,
    "sup:"
);
numeric_id!(
    /// Catalog identifier of a component category.
    CategoryId,
    "cat:"
);
numeric_id!(
    /// Catalog identifier of a manufacturer.
    ManufacturerId,
    "mfr:"
);
numeric_id!(
    /// Surrogate identifier of a ledger document.
    DocumentId,
    "doc:"
);
numeric_id!(
    /// Position of an entry in the audit log. Starts at 1.
    AuditSeq,
    "#"
);

impl AuditSeq {
    /// The sequence number following this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert_eq!(ComponentId(7).to_string(), "cmp:7");
        assert_eq!(DocumentId(12).to_string(), "doc:12");
        assert_eq!(AuditSeq(3).to_string(), "#3");
    }

    #[test]
    fn parse_accepts_bare_and_prefixed() {
        assert_eq!("42".parse::<LocationId>().unwrap(), LocationId(42));
        assert_eq!("loc:42".parse::<LocationId>().unwrap(), LocationId(42));
        assert!(matches!(
            "cmp:x".parse::<ComponentId>(),
            Err(TypeError::InvalidId(_))
        ));
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&SupplierId(5)).unwrap();
        assert_eq!(json, "5");
        let back: SupplierId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SupplierId(5));
    }

    #[test]
    fn audit_seq_advances() {
        assert_eq!(AuditSeq(1).next(), AuditSeq(2));
    }
}
